//! Plain-text level parser

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::util::{Rect, Vec2};

use super::grid::{Tile, TileCollision, TileGrid, TILE_HEIGHT, TILE_WIDTH};

/// Errors raised while building a level from text
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("Level file is empty")]
    Empty,

    #[error("Line {line} is {found} tiles wide, expected {expected}")]
    UnevenRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unsupported tile character '{ch}' at {x}, {y}")]
    UnknownTile { ch: char, x: usize, y: usize },

    #[error("Level has no usable spawn point for combatant {0}")]
    MissingSpawn(usize),

    #[error("Level has no exit for combatant {0}")]
    MissingExit(usize),

    #[error("Boss level has no win tile")]
    MissingWinTile,

    #[error("Attacker must be combatant 0 or 1, got {0}")]
    InvalidAttacker(usize),
}

/// Enemy archetypes placed by the level file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    MonsterA,
    MonsterB,
    MonsterC,
    MonsterD,
    Bowser,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemySpawn {
    pub kind: EnemyKind,
    /// Bottom-centre of the spawn tile
    pub position: Vec2,
}

/// Match state that decides which conditional spawn tiles are live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnRules {
    pub attacker: usize,
    pub first_kill: bool,
    /// Boss levels bench the non-attacker and end on a win tile instead of an exit
    pub boss_level: bool,
}

impl SpawnRules {
    fn allows(&self, combatant: usize, gate: SpawnGate) -> bool {
        if self.boss_level && combatant != self.attacker {
            return false;
        }
        match gate {
            SpawnGate::Always => true,
            SpawnGate::WhenAttacking => combatant == self.attacker,
            SpawnGate::AfterFirstKill => self.first_kill,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SpawnGate {
    Always,
    WhenAttacking,
    AfterFirstKill,
}

/// Everything a level file places, in world coordinates
#[derive(Debug, Clone)]
pub struct LevelLayout {
    pub grid: TileGrid,
    /// Resolved spawn per combatant; `None` benches that combatant
    pub spawns: [Option<Vec2>; 2],
    /// Exit tile centre per combatant
    pub exits: [Option<Vec2>; 2],
    /// Gem centres
    pub gems: Vec<Vec2>,
    pub enemies: Vec<EnemySpawn>,
    /// Hazard bottom-centres
    pub hazards: Vec<Vec2>,
    pub switches: Vec<(i32, i32)>,
    pub win_tiles: Vec<(i32, i32)>,
    /// Bridge cells in reading order
    pub bridge: Vec<(i32, i32)>,
}

enum Placement {
    None,
    Spawn(usize, SpawnGate),
    Exit(usize),
    Gem,
    Enemy(EnemyKind),
    Hazard,
    Switch,
    Win,
    Bridge,
}

fn classify_char(ch: char) -> Option<(TileCollision, Placement)> {
    use TileCollision::*;
    let entry = match ch {
        '.' | '|' | ':' => (Passable, Placement::None),
        '#' | '%' | '@' | '$' | '&' => (Impassable, Placement::None),
        '-' => (Platform, Placement::None),
        '~' => (Platform, Placement::Bridge),
        'X' => (Passable, Placement::Exit(0)),
        'Q' => (Passable, Placement::Exit(1)),
        '1' => (Passable, Placement::Spawn(0, SpawnGate::Always)),
        '2' => (Passable, Placement::Spawn(1, SpawnGate::Always)),
        '3' => (Passable, Placement::Spawn(0, SpawnGate::WhenAttacking)),
        '4' => (Passable, Placement::Spawn(1, SpawnGate::WhenAttacking)),
        '5' => (Passable, Placement::Spawn(0, SpawnGate::AfterFirstKill)),
        '6' => (Passable, Placement::Spawn(1, SpawnGate::AfterFirstKill)),
        'A' => (Passable, Placement::Enemy(EnemyKind::MonsterA)),
        'B' => (Passable, Placement::Enemy(EnemyKind::MonsterB)),
        'C' => (Passable, Placement::Enemy(EnemyKind::MonsterC)),
        'D' => (Passable, Placement::Enemy(EnemyKind::MonsterD)),
        'E' => (Passable, Placement::Enemy(EnemyKind::Bowser)),
        'G' => (Passable, Placement::Gem),
        '^' => (Passable, Placement::Hazard),
        'T' => (Passable, Placement::Switch),
        'W' => (Passable, Placement::Win),
        _ => return None,
    };
    Some(entry)
}

/// Parse a level file.
///
/// Rows must all be the same width and every character must be known. A
/// level is rejected when the attacker has no live spawn, when an active
/// combatant has no exit, or when a boss level has no win tile.
pub fn parse_level(text: &str, rules: SpawnRules) -> Result<LevelLayout, LevelError> {
    if rules.attacker > 1 {
        return Err(LevelError::InvalidAttacker(rules.attacker));
    }
    let rows: Vec<&str> = text.lines().collect();
    let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
    if width == 0 {
        return Err(LevelError::Empty);
    }

    let mut tiles = Vec::with_capacity(width * rows.len());
    let mut layout = LevelLayout {
        grid: TileGrid::from_rows(0, 0, Vec::new()),
        spawns: [None, None],
        exits: [None, None],
        gems: Vec::new(),
        enemies: Vec::new(),
        hazards: Vec::new(),
        switches: Vec::new(),
        win_tiles: Vec::new(),
        bridge: Vec::new(),
    };

    for (y, row) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(LevelError::UnevenRow {
                line: y + 1,
                expected: width,
                found,
            });
        }

        for (x, ch) in row.chars().enumerate() {
            let (collision, placement) =
                classify_char(ch).ok_or(LevelError::UnknownTile { ch, x, y })?;
            tiles.push(Tile::new(collision, ch));

            let (cx, cy) = (x as i32, y as i32);
            let bounds = Rect::new(cx * TILE_WIDTH, cy * TILE_HEIGHT, TILE_WIDTH, TILE_HEIGHT);
            match placement {
                Placement::None => {}
                Placement::Spawn(idx, gate) => {
                    if rules.allows(idx, gate) {
                        layout.spawns[idx] = Some(bounds.bottom_center());
                    }
                }
                Placement::Exit(idx) => layout.exits[idx] = Some(bounds.center()),
                Placement::Gem => layout.gems.push(bounds.center()),
                Placement::Enemy(kind) => layout.enemies.push(EnemySpawn {
                    kind,
                    position: bounds.bottom_center(),
                }),
                Placement::Hazard => layout.hazards.push(bounds.bottom_center()),
                Placement::Switch => layout.switches.push((cx, cy)),
                Placement::Win => layout.win_tiles.push((cx, cy)),
                Placement::Bridge => layout.bridge.push((cx, cy)),
            }
        }
    }

    if layout.spawns[rules.attacker].is_none() {
        return Err(LevelError::MissingSpawn(rules.attacker));
    }
    if rules.boss_level {
        if layout.win_tiles.is_empty() {
            return Err(LevelError::MissingWinTile);
        }
    } else {
        for idx in 0..2 {
            if layout.spawns[idx].is_some() && layout.exits[idx].is_none() {
                return Err(LevelError::MissingExit(idx));
            }
        }
    }

    layout.grid = TileGrid::from_rows(width, rows.len(), tiles);
    debug!(
        width,
        height = rows.len(),
        gems = layout.gems.len(),
        enemies = layout.enemies.len(),
        "Level parsed"
    );
    Ok(layout)
}
