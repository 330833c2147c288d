//! Shared helpers: fixed-step timing and integer/float geometry

pub mod geometry;
pub mod time;

pub use geometry::{Rect, Vec2};
