//! Read-only render snapshots

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::level::EnemyKind;
use crate::util::Vec2;

use super::combat::{Weapon, WeaponKind};
use super::combatant::{AnimationState, Combatant};
use super::enemy::{BowserState, Enemy};
use super::r#match::{Corpse, MatchController, MatchPhase};
use super::Facing;

/// Renderer view of one combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
    pub animation: AnimationState,
    pub health: f32,
    pub alive: bool,
    pub active: bool,
    pub rolling: bool,
    pub pulse_red: bool,
    pub weapon: WeaponKind,
    pub grenade_charge: f32,
    pub total_kills: u32,
}

/// Renderer view of one enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub index: usize,
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
    pub alive: bool,
    pub pulse_red: bool,
    /// Boss decision state, absent for walkers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boss_state: Option<BowserState>,
}

/// A live projectile, swing or blast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub weapon: WeaponKind,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub exploding: bool,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub match_id: Uuid,
    pub level: usize,
    pub tick: u64,
    pub phase: MatchPhase,
    pub attacker: usize,
    pub first_kill: bool,
    pub score: u32,
    pub time_remaining: f32,
    pub camera_x: f32,
    pub combatants: Vec<CombatantSnapshot>,
    pub enemies: Vec<EnemySnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub gems: Vec<Vec2>,
    pub corpses: Vec<Corpse>,
}

/// Decides when to emit snapshots and builds them
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    pub fn build(&self, level: &MatchController) -> Snapshot {
        let combatants = level.combatants().iter().map(combatant_snapshot).collect();
        let enemies = level.enemies().iter().map(enemy_snapshot).collect();

        let mut projectiles = Vec::new();
        for c in level.combatants() {
            for kind in [WeaponKind::Handgun, WeaponKind::Shotgun, WeaponKind::Knife, WeaponKind::Grenade] {
                if let Some(weapon) = c.arsenal.weapon(kind) {
                    push_weapon(&mut projectiles, weapon);
                }
            }
        }
        for e in level.enemies() {
            if let Some(boss) = e.as_bowser() {
                push_weapon(&mut projectiles, boss.breath_weapon());
            }
        }

        let corpses = (0..level.combatants().len())
            .filter_map(|i| level.corpses(i))
            .flat_map(|ring| ring.iter().copied())
            .collect();

        Snapshot {
            match_id: level.id(),
            level: level.index(),
            tick: level.tick(),
            phase: level.phase(),
            attacker: level.attacker(),
            first_kill: level.first_kill(),
            score: level.score(),
            time_remaining: level.time_remaining(),
            camera_x: level.camera().position,
            combatants,
            enemies,
            projectiles,
            gems: level.gems().to_vec(),
            corpses,
        }
    }
}

fn combatant_snapshot(c: &Combatant) -> CombatantSnapshot {
    CombatantSnapshot {
        index: c.index,
        x: c.body.position.x,
        y: c.body.position.y,
        facing: c.facing,
        animation: c.animation(),
        health: c.health,
        alive: c.alive,
        active: c.active,
        rolling: c.is_rolling(),
        pulse_red: c.pulse_red,
        weapon: c.arsenal.active_kind(),
        grenade_charge: c.arsenal.grenade().charge(),
        total_kills: c.total_kills,
    }
}

fn enemy_snapshot(e: &Enemy) -> EnemySnapshot {
    let position = e.position();
    EnemySnapshot {
        index: e.index(),
        kind: e.kind(),
        x: position.x,
        y: position.y,
        facing: e.facing(),
        alive: e.is_alive(),
        pulse_red: e.pulse_red(),
        boss_state: e.as_bowser().map(|b| b.state),
    }
}

fn push_weapon(out: &mut Vec<ProjectileSnapshot>, weapon: &Weapon) {
    out.extend(weapon.live_projectiles().map(|p| ProjectileSnapshot {
        weapon: weapon.kind,
        x: p.position.x,
        y: p.position.y,
        exploding: false,
    }));
    if let Some(blast) = weapon.explosion() {
        out.push(ProjectileSnapshot {
            weapon: weapon.kind,
            x: blast.position.x,
            y: blast.position.y,
            exploding: true,
        });
    }
}
