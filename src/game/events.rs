//! Per-tick events emitted to the presentation layer

use serde::{Deserialize, Serialize};

use super::combat::{HitSource, TargetId, WeaponKind};

/// Kill-streak announcement tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillStreakTier {
    Double,
    Multi,
    HolyShit,
    Dominating,
    KillingSpree,
    MegaKill,
    Godlike,
    Unstoppable,
    MonsterKill,
    UltraKill,
}

impl KillStreakTier {
    /// Tier for a streak length. Streaks of four or more pick a tier from
    /// `roll`, a uniform draw in `[1, 200)`.
    pub fn for_streak(streak: u32, roll: u32) -> Option<Self> {
        match streak {
            0 | 1 => None,
            2 => Some(Self::Double),
            3 => Some(Self::Multi),
            _ => Some(match roll {
                0..=24 => Self::HolyShit,
                25..=49 => Self::Dominating,
                50..=74 => Self::KillingSpree,
                75..=99 => Self::MegaKill,
                100..=124 => Self::Godlike,
                125..=149 => Self::Unstoppable,
                150..=174 => Self::MonsterKill,
                _ => Self::UltraKill,
            }),
        }
    }
}

/// Sounds the audio layer may play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    Jump,
    Roll,
    PistolShot,
    ShotgunShot,
    KnifeSwing,
    GrenadeThrow,
    Explosion,
    FireBreath,
    Hit,
    Killed,
    GemCollected,
    ExitReached,
    FirstBlood,
}

/// Why a combatant died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Weapon,
    Hazard,
    Fall,
    EnemyContact,
    BossFire,
}

/// Game events (shots, hits, kills, pickups, transitions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Weapon fired or swung
    Shot {
        shooter: HitSource,
        weapon: WeaponKind,
        x: f32,
        y: f32,
    },

    /// Damage landed
    Hit {
        source: HitSource,
        target: TargetId,
        damage: f32,
    },

    /// Combatant killed
    Kill {
        killer: Option<usize>,
        victim: usize,
        cause: DeathCause,
    },

    EnemyKilled {
        enemy: usize,
        source: HitSource,
    },

    GrenadeExploded {
        x: f32,
        y: f32,
    },

    AttackerChanged {
        attacker: usize,
    },

    FirstBlood {
        killer: Option<usize>,
        victim: usize,
    },

    KillStreak {
        combatant: usize,
        tier: KillStreakTier,
    },

    GemCollected {
        combatant: usize,
        points: u32,
    },

    Respawned {
        combatant: usize,
        x: f32,
        y: f32,
    },

    BridgeTriggered,

    BridgeWithdrawn {
        x: i32,
        y: i32,
    },

    LevelStarted {
        index: usize,
    },

    ExitReached {
        combatant: usize,
    },

    LevelCompleted {
        index: usize,
        score: u32,
    },

    Victory {
        combatant: usize,
    },

    Defeat {
        combatant: usize,
    },

    Sound {
        cue: SoundCue,
    },
}
