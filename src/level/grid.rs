//! Static tile collision lookup

use serde::{Deserialize, Serialize};

use crate::util::Rect;

/// Tile width in pixels
pub const TILE_WIDTH: i32 = 40;
/// Tile height in pixels
pub const TILE_HEIGHT: i32 = 32;

/// How a tile reacts to bodies overlapping it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileCollision {
    /// Never blocks
    Passable,
    /// Blocks from every side
    Impassable,
    /// Blocks only bodies landing on it from above
    Platform,
}

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub collision: TileCollision,
    /// Source character, used by the renderer to pick a skin
    pub visual_id: char,
}

impl Tile {
    pub const EMPTY: Tile = Tile {
        collision: TileCollision::Passable,
        visual_id: '.',
    };

    pub const fn new(collision: TileCollision, visual_id: char) -> Self {
        Self {
            collision,
            visual_id,
        }
    }
}

/// Row-major grid of tiles fixed at load time.
///
/// The only runtime mutation is [`TileGrid::withdraw`], used by bridges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Build a grid from row-major tiles. `tiles.len()` must equal `width * height`.
    pub(crate) fn from_rows(width: usize, height: usize, tiles: Vec<Tile>) -> Self {
        debug_assert_eq!(tiles.len(), width * height);
        Self {
            width,
            height,
            tiles,
        }
    }

    /// Width in tiles
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in tiles
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_width(&self) -> f32 {
        (self.width as i32 * TILE_WIDTH) as f32
    }

    pub fn pixel_height(&self) -> f32 {
        (self.height as i32 * TILE_HEIGHT) as f32
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        self.index(x, y).map(|i| &self.tiles[i])
    }

    /// Collision class of a cell. Columns outside the grid are walls,
    /// rows above and below it are open air.
    pub fn classify(&self, x: i32, y: i32) -> TileCollision {
        if x < 0 || x as usize >= self.width {
            return TileCollision::Impassable;
        }
        if y < 0 || y as usize >= self.height {
            return TileCollision::Passable;
        }
        self.tiles[y as usize * self.width + x as usize].collision
    }

    /// World-space box of a cell
    pub fn bounds_of(&self, x: i32, y: i32) -> Rect {
        Rect::new(x * TILE_WIDTH, y * TILE_HEIGHT, TILE_WIDTH, TILE_HEIGHT)
    }

    /// Inclusive cell range `(left, right, top, bottom)` touched by a box
    pub fn cells_overlapping(&self, bounds: &Rect) -> (i32, i32, i32, i32) {
        let left = (bounds.left() as f32 / TILE_WIDTH as f32).floor() as i32;
        let right = (bounds.right() as f32 / TILE_WIDTH as f32).ceil() as i32 - 1;
        let top = (bounds.top() as f32 / TILE_HEIGHT as f32).floor() as i32;
        let bottom = (bounds.bottom() as f32 / TILE_HEIGHT as f32).ceil() as i32 - 1;
        (left, right, top, bottom)
    }

    /// True when any non-passable cell overlaps `bounds`
    pub fn is_solid_at(&self, bounds: &Rect) -> bool {
        let (left, right, top, bottom) = self.cells_overlapping(bounds);
        (top..=bottom).any(|y| {
            (left..=right).any(|x| self.classify(x, y) != TileCollision::Passable)
        })
    }

    /// Turn a cell passable. Returns false when nothing changed.
    pub fn withdraw(&mut self, x: i32, y: i32) -> bool {
        match self.index(x, y) {
            Some(i) if self.tiles[i].collision != TileCollision::Passable => {
                self.tiles[i] = Tile::new(TileCollision::Passable, '.');
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> TileGrid {
        let width = rows[0].len();
        let tiles = rows
            .iter()
            .flat_map(|row| row.chars())
            .map(|c| match c {
                '#' => Tile::new(TileCollision::Impassable, c),
                '-' => Tile::new(TileCollision::Platform, c),
                _ => Tile::EMPTY,
            })
            .collect();
        TileGrid::from_rows(width, rows.len(), tiles)
    }

    #[test]
    fn out_of_bounds_rules() {
        let g = grid(&["...", "..."]);
        assert_eq!(g.classify(-1, 0), TileCollision::Impassable);
        assert_eq!(g.classify(3, 1), TileCollision::Impassable);
        assert_eq!(g.classify(0, -1), TileCollision::Passable);
        assert_eq!(g.classify(1, 2), TileCollision::Passable);
        // corners follow the horizontal rule
        assert_eq!(g.classify(-1, -1), TileCollision::Impassable);
    }

    #[test]
    fn bounds_use_tile_size() {
        let g = grid(&["..", ".."]);
        assert_eq!(g.bounds_of(1, 1), Rect::new(40, 32, 40, 32));
    }

    #[test]
    fn withdraw_is_idempotent() {
        let mut g = grid(&["-#"]);
        assert!(g.withdraw(0, 0));
        assert!(!g.withdraw(0, 0));
        assert_eq!(g.classify(0, 0), TileCollision::Passable);
        assert!(!g.withdraw(9, 9));
    }

    #[test]
    fn cell_range_excludes_touching_edge() {
        let g = grid(&["...", "..."]);
        let (l, r, t, b) = g.cells_overlapping(&Rect::new(0, 0, 40, 32));
        assert_eq!((l, r, t, b), (0, 0, 0, 0));
    }
}
