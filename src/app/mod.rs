//! Headless runner: file loading and the tick loop

pub mod files;
pub mod runner;

pub use files::{load_levels, load_transcript, FileError, TranscriptFrame};
pub use runner::{RunSummary, Runner, StopReason};
