//! Game simulation modules

pub mod camera;
pub mod campaign;
pub mod combat;
pub mod combatant;
pub mod enemy;
pub mod events;
pub mod r#match;
pub mod physics;
pub mod snapshot;

pub use campaign::{Campaign, CampaignError, LevelTransition, MatchSettings};
pub use combat::{HitEvent, HitSource, TargetId, WeaponKind};
pub use combatant::Combatant;
pub use events::{DeathCause, GameEvent, KillStreakTier, SoundCue};
pub use r#match::{MatchController, MatchPhase, MatchSetup};
pub use snapshot::{Snapshot, SnapshotBuilder};

use serde::{Deserialize, Serialize};

/// Which way an entity is looking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// -1 for left, +1 for right
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn toward(dx: f32) -> Self {
        if dx < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        }
    }
}

/// Weapon change requested by the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponSwitch {
    /// Cycle handgun, shotgun, knife
    Next,
    Select(WeaponKind),
}

/// Input state for a single combatant and tick.
///
/// Edge flags (`roll_pressed`, `fire_pressed`) are true only on the tick the
/// button went down; held flags stay true while the button is down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputCommand {
    /// Horizontal axis in [-1, 1]
    pub axis: f32,
    pub jump_held: bool,
    pub roll_pressed: bool,
    pub fire_pressed: bool,
    pub weapon_switch: Option<WeaponSwitch>,
    pub grenade_held: bool,
}

impl InputCommand {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn run(axis: f32) -> Self {
        Self {
            axis,
            ..Self::default()
        }
    }
}
