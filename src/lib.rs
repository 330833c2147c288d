//! Duel Platformer - deterministic simulation core for a two-player tile platformer
//!
//! The library holds the per-tick simulation:
//! - Tile grids and the plain-text level format
//! - Kinematic bodies with jump and roll curves, resolved against the grid
//! - Pooled weapons, hit detection and the attacker turn rule
//! - Enemies, the boss AI, camera, scoring and level sequencing
//!
//! The binary wraps it in a headless runner.

pub mod app;
pub mod config;
pub mod game;
pub mod level;
pub mod util;
