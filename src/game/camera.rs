//! Side-scrolling camera and the spawn points it implies

use crate::level::{TileGrid, TILE_WIDTH};

/// Fraction of the viewport on each side that the focus may move in freely
const VIEW_MARGIN: f32 = 0.35;
/// Tiles outside the view after which a combatant counts as a straggler
const STRAGGLER_TILES: i32 = 3;
/// Pre-first-blood focus sits this many tiles right of the level centre
const OPENING_BIAS_TILES: f32 = 2.6;

/// Horizontal camera; `position` is the left edge of the view in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: f32,
    pub viewport_width: f32,
}

impl Camera {
    pub fn new(viewport_width: f32) -> Self {
        Self {
            position: 0.0,
            viewport_width,
        }
    }

    fn max_position(&self, grid: &TileGrid) -> f32 {
        (grid.pixel_width() - self.viewport_width).max(0.0)
    }

    /// Scroll so `focus_x` stays inside the dead zone, clamped to the level
    pub fn follow(&mut self, focus_x: f32, grid: &TileGrid) {
        let margin = self.viewport_width * VIEW_MARGIN;
        let margin_left = self.position + margin;
        let margin_right = self.position + self.viewport_width - margin;

        let movement = if focus_x < margin_left {
            focus_x - margin_left
        } else if focus_x > margin_right {
            focus_x - margin_right
        } else {
            0.0
        };

        self.position = (self.position + movement).clamp(0.0, self.max_position(grid));
    }

    /// Jump straight to a view centred on `focus_x`
    pub fn center_on(&mut self, focus_x: f32, grid: &TileGrid) {
        self.position = (focus_x - self.viewport_width / 2.0).clamp(0.0, self.max_position(grid));
    }

    /// Focus used before anyone has been killed
    pub fn opening_focus(grid: &TileGrid) -> f32 {
        grid.pixel_width() / 2.0 + TILE_WIDTH as f32 * OPENING_BIAS_TILES
    }

    /// Respawn x just beyond the edge the attacker is heading for.
    ///
    /// Combatant 0 attacks rightward, so its victims reappear past the right
    /// edge; combatant 1 attacks leftward. `None` when that point is off the level.
    pub fn spawn_x(&self, attacker: usize, grid: &TileGrid) -> Option<f32> {
        let tile = TILE_WIDTH as f32;
        if attacker == 0 {
            let x = self.position + self.viewport_width + tile;
            (x < grid.pixel_width()).then_some(x)
        } else {
            let x = self.position - tile;
            (x >= 0.0).then_some(x)
        }
    }

    /// True when `x` lies more than a few tiles outside the view
    pub fn is_straggler(&self, x: f32, grid: &TileGrid) -> bool {
        let left = (self.position / TILE_WIDTH as f32).floor() as i32;
        let visible = (self.viewport_width / TILE_WIDTH as f32) as i32;
        let right = (left + visible).min(grid.width() as i32 - 1);
        let slack = STRAGGLER_TILES * TILE_WIDTH;

        x < (left * TILE_WIDTH - slack) as f32 || x > (right * TILE_WIDTH + slack) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{parse_level, SpawnRules};

    fn wide_level() -> TileGrid {
        // 50 tiles, 2000 px
        let mut row = String::from("1");
        row.push_str(&".".repeat(48));
        row.push('X');
        let text = format!("{}\n{}\n{}", ".".repeat(50), row, "#".repeat(50));
        parse_level(&text, SpawnRules::default()).unwrap().grid
    }

    #[test]
    fn follow_respects_dead_zone_and_clamp() {
        let grid = wide_level();
        let mut cam = Camera::new(800.0);

        cam.follow(400.0, &grid);
        assert_eq!(cam.position, 0.0);

        cam.follow(1000.0, &grid);
        assert_eq!(cam.position, 1000.0 - 520.0);

        cam.follow(5000.0, &grid);
        assert_eq!(cam.position, 1200.0);

        cam.follow(-100.0, &grid);
        assert_eq!(cam.position, 0.0);
    }

    #[test]
    fn narrow_level_pins_camera() {
        let text = "1..X\n####";
        let grid = parse_level(text, SpawnRules::default()).unwrap().grid;
        let mut cam = Camera::new(800.0);
        cam.follow(150.0, &grid);
        assert_eq!(cam.position, 0.0);
        assert_eq!(cam.spawn_x(0, &grid), None);
        assert_eq!(cam.spawn_x(1, &grid), None);
    }

    #[test]
    fn spawn_points_sit_past_the_view() {
        let grid = wide_level();
        let cam = Camera {
            position: 400.0,
            viewport_width: 800.0,
        };
        assert_eq!(cam.spawn_x(0, &grid), Some(1240.0));
        assert_eq!(cam.spawn_x(1, &grid), Some(360.0));
    }

    #[test]
    fn stragglers_are_three_tiles_out() {
        let grid = wide_level();
        let cam = Camera {
            position: 400.0,
            viewport_width: 800.0,
        };
        // view covers tiles 10..=30
        assert!(!cam.is_straggler(300.0, &grid));
        assert!(cam.is_straggler(279.0, &grid));
        assert!(!cam.is_straggler(1320.0, &grid));
        assert!(cam.is_straggler(1321.0, &grid));
    }
}
