//! Level data: tile grid and level file parsing

pub mod grid;
pub mod loader;

pub use grid::{Tile, TileCollision, TileGrid, TILE_HEIGHT, TILE_WIDTH};
pub use loader::{parse_level, EnemyKind, EnemySpawn, LevelError, LevelLayout, SpawnRules};
