//! Player-controlled fighters

use serde::{Deserialize, Serialize};

use crate::level::TileGrid;
use crate::util::{Rect, Vec2};

use super::combat::{Arsenal, CombatSystem, Damageable, HitEvent, HitSource, TargetId, WeaponOrders};
use super::events::{GameEvent, SoundCue};
use super::physics::{BodyInput, BodyKind, BodyStats, KinematicBody, PhysicsSystem};
use super::{Facing, InputCommand, WeaponSwitch};

pub const MAX_HEALTH: f32 = 100.0;
/// Length of the hit flash
const PULSE_TIME: f32 = 0.4;
/// Horizontal speed below which a grounded fighter counts as idle
const RUN_THRESHOLD: f32 = 0.02;

/// Animation tag read by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationState {
    Idle,
    Running,
    Jumping,
    Rolling,
    Charging,
    /// Knife swing in progress
    Attacking,
    Dying,
    Celebrating,
}

/// Kill tallies a fighter carries from one level into the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillRecord {
    pub kill_streak: u32,
    pub total_kills: u32,
}

/// One of the two duelling fighters
#[derive(Debug, Clone)]
pub struct Combatant {
    pub index: usize,
    pub body: KinematicBody,
    pub health: f32,
    pub alive: bool,
    /// False when benched for the level
    pub active: bool,
    pub facing: Facing,
    pub arsenal: Arsenal,
    /// Kills since this fighter last died
    pub kill_streak: u32,
    pub total_kills: u32,
    pub respawn_position: Vec2,
    pub pulse_red: bool,
    pulse_time: f32,
    /// Side the last hit came from
    pub hit_from_direction: f32,
    /// Seconds since death
    pub dead_for: f32,
    pub charging: bool,
    pub celebrating: bool,
    grenade_was_held: bool,
}

impl Combatant {
    /// A fighter at `spawn`, or benched when there is none
    pub fn new(index: usize, spawn: Option<Vec2>) -> Self {
        let position = spawn.unwrap_or(Vec2::ZERO);
        let mut combatant = Self {
            index,
            body: KinematicBody::new(position, BodyStats::for_kind(BodyKind::Combatant)),
            health: MAX_HEALTH,
            alive: true,
            active: true,
            facing: Facing::Right,
            arsenal: Arsenal::default(),
            kill_streak: 0,
            total_kills: 0,
            respawn_position: position,
            pulse_red: false,
            pulse_time: 0.0,
            hit_from_direction: 0.0,
            dead_for: 0.0,
            charging: false,
            celebrating: false,
            grenade_was_held: false,
        };
        if spawn.is_none() {
            combatant.bench();
        }
        combatant
    }

    pub fn kill_record(&self) -> KillRecord {
        KillRecord {
            kill_streak: self.kill_streak,
            total_kills: self.total_kills,
        }
    }

    pub fn restore_record(&mut self, record: KillRecord) {
        self.kill_streak = record.kill_streak;
        self.total_kills = record.total_kills;
    }

    /// Take the fighter out of play for the level
    pub fn bench(&mut self) {
        self.active = false;
        self.alive = false;
        self.arsenal.reset_all();
    }

    /// Revive at `position` with full health and no motion
    pub fn reset(&mut self, position: Vec2) {
        self.body.reset(position);
        self.health = MAX_HEALTH;
        self.alive = true;
        self.pulse_red = false;
        self.pulse_time = 0.0;
        self.dead_for = 0.0;
        self.charging = false;
        self.celebrating = false;
        self.grenade_was_held = false;
    }

    pub fn bounds(&self) -> Rect {
        self.body.bounds()
    }

    pub fn is_rolling(&self) -> bool {
        self.body.is_rolling()
    }

    /// Alive and taking part in the level
    pub fn in_play(&self) -> bool {
        self.active && self.alive
    }

    /// Drop to the ground dead: streak, flash and weapons are cleared
    pub fn die(&mut self) {
        self.health = 0.0;
        self.alive = false;
        self.pulse_red = false;
        self.pulse_time = 0.0;
        self.dead_for = 0.0;
        self.charging = false;
        self.kill_streak = 0;
        self.arsenal.reset_all();
    }

    /// Turn this tick's input into movement and weapon orders
    pub fn plan(&mut self, input: &InputCommand, dt: f32) -> (BodyInput, WeaponOrders) {
        match input.weapon_switch {
            Some(WeaponSwitch::Next) => self.arsenal.switch_next(),
            Some(WeaponSwitch::Select(kind)) => self.arsenal.select(kind),
            None => {}
        }

        if input.roll_pressed {
            self.body.try_start_roll();
        }

        let mut orders = WeaponOrders::default();
        self.charging = false;
        if !self.body.is_rolling() {
            if self.grenade_was_held && !input.grenade_held {
                orders.throw_grenade = true;
            }
            if input.grenade_held && self.body.is_on_ground && self.arsenal.grenade().is_ready() {
                self.charging = true;
                self.arsenal.grenade_mut().charge_up(dt);
            } else if input.fire_pressed {
                orders.fire = true;
            }
        }
        self.grenade_was_held = input.grenade_held;

        let body_input = if self.charging {
            BodyInput {
                movement: 0.0,
                jump: false,
                direction: self.facing.sign(),
            }
        } else {
            BodyInput {
                movement: input.axis,
                jump: input.jump_held,
                direction: self.facing.sign(),
            }
        };
        (body_input, orders)
    }

    /// Integrate the body against the grid and the other fighters' boxes
    pub fn step_body(
        &mut self,
        input: BodyInput,
        grid: &TileGrid,
        blockers: &[Rect],
        dt: f32,
        events: &mut Vec<GameEvent>,
    ) {
        let outcome = PhysicsSystem::step(&mut self.body, input, grid, blockers, dt);
        if outcome.jump_started {
            events.push(GameEvent::Sound { cue: SoundCue::Jump });
        }
        if outcome.roll_started {
            events.push(GameEvent::Sound { cue: SoundCue::Roll });
        }

        if self.body.velocity.x > 0.0 {
            self.facing = Facing::Right;
        } else if self.body.velocity.x < 0.0 {
            self.facing = Facing::Left;
        }

        if self.pulse_red {
            self.pulse_time += dt;
            if self.pulse_time > PULSE_TIME {
                self.pulse_red = false;
                self.pulse_time = 0.0;
            }
        }
    }

    pub fn animation(&self) -> AnimationState {
        if !self.alive {
            AnimationState::Dying
        } else if self.celebrating {
            AnimationState::Celebrating
        } else if self.body.is_rolling() {
            AnimationState::Rolling
        } else if self.charging {
            AnimationState::Charging
        } else if self.arsenal.active().is_swinging() {
            AnimationState::Attacking
        } else if !self.body.is_on_ground {
            AnimationState::Jumping
        } else if self.body.velocity.x.abs() - RUN_THRESHOLD > 0.0 {
            AnimationState::Running
        } else {
            AnimationState::Idle
        }
    }
}

impl Damageable for Combatant {
    fn target_id(&self) -> TargetId {
        TargetId::Combatant(self.index)
    }

    fn hit_bounds(&self) -> Rect {
        self.body.bounds()
    }

    fn can_be_hit(&self) -> bool {
        self.in_play() && !self.body.is_rolling()
    }

    fn take_hit(&mut self, damage: f32, from_direction: f32, source: HitSource) -> HitEvent {
        let (health, killed) = CombatSystem::apply_damage(self.health, damage);
        self.health = health;
        self.pulse_red = true;
        self.pulse_time = 0.0;
        self.hit_from_direction = from_direction;
        if killed {
            self.die();
        }
        HitEvent {
            target: self.target_id(),
            source,
            damage,
            from_direction,
            killed,
        }
    }
}
