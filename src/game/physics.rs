//! Body kinematics and tile collision resolution

use crate::level::{TileCollision, TileGrid};
use crate::util::{Rect, Vec2};

/// Which physics profile a body uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Combatant,
    Bowser,
}

/// Movement constants per body kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyStats {
    /// Horizontal acceleration from full input
    pub move_acceleration: f32,
    /// Horizontal speed cap
    pub max_move_speed: f32,
    pub ground_drag: f32,
    pub air_drag: f32,
    /// Length of the powered part of a jump (seconds)
    pub max_jump_time: f32,
    /// Vertical speed at the start of a jump (negative is up)
    pub jump_launch_velocity: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    /// Exponent of the jump power curve
    pub jump_control_power: f32,
    /// Length of a roll (seconds)
    pub max_roll_time: f32,
    pub roll_control_power: f32,
    /// Time before another roll may start (seconds)
    pub roll_cooldown: f32,
    /// Collision box width in pixels
    pub width: i32,
    /// Collision box height in pixels
    pub height: i32,
}

impl BodyStats {
    pub fn for_kind(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Combatant => Self {
                move_acceleration: 12000.0,
                max_move_speed: 2000.0,
                ground_drag: 0.65,
                air_drag: 0.52,
                max_jump_time: 0.3,
                jump_launch_velocity: -3500.0,
                gravity: 3400.0,
                max_fall_speed: 550.0,
                jump_control_power: 0.14,
                max_roll_time: 0.35,
                roll_control_power: 0.21,
                roll_cooldown: 2.0,
                width: 25,
                height: 51,
            },
            BodyKind::Bowser => Self {
                move_acceleration: 6000.0,
                max_move_speed: 900.0,
                ground_drag: 0.6,
                air_drag: 0.55,
                max_jump_time: 0.35,
                jump_launch_velocity: -3000.0,
                gravity: 3400.0,
                max_fall_speed: 550.0,
                jump_control_power: 0.14,
                max_roll_time: 0.0,
                roll_control_power: 1.0,
                roll_cooldown: 0.0,
                width: 60,
                height: 80,
            },
        }
    }
}

/// Per-tick movement intent for a body
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyInput {
    /// Horizontal axis in [-1, 1]
    pub movement: f32,
    /// Jump button held
    pub jump: bool,
    /// +1 facing right, -1 facing left
    pub direction: f32,
}

/// What happened during one integration step
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutcome {
    pub previous_position: Vec2,
    /// A jump began this tick
    pub jump_started: bool,
    /// A roll began this tick
    pub roll_started: bool,
}

/// Position/velocity integrator shared by combatants and the boss.
///
/// `position` is the bottom-centre of the collision box.
#[derive(Debug, Clone)]
pub struct KinematicBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub previous_bottom: f32,
    pub is_on_ground: bool,
    pub stats: BodyStats,

    jump_time: f32,
    was_jumping: bool,

    is_rolling: bool,
    was_rolling: bool,
    roll_time: f32,
    can_roll_again: bool,
    roll_rate_time: f32,
}

impl KinematicBody {
    pub fn new(position: Vec2, stats: BodyStats) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            previous_bottom: position.y,
            is_on_ground: false,
            stats,
            jump_time: 0.0,
            was_jumping: false,
            is_rolling: false,
            was_rolling: false,
            roll_time: 0.0,
            can_roll_again: true,
            roll_rate_time: 0.0,
        }
    }

    /// Place the body and clear all motion state. The roll cooldown survives.
    pub fn reset(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.previous_bottom = position.y;
        self.jump_time = 0.0;
        self.was_jumping = false;
        self.is_rolling = false;
        self.was_rolling = false;
        self.roll_time = 0.0;
    }

    /// Collision box in whole pixels
    pub fn bounds(&self) -> Rect {
        let left = self.position.x.round() as i32 - (self.stats.width + 1) / 2;
        let top = self.position.y.round() as i32 - self.stats.height;
        Rect::new(left, top, self.stats.width, self.stats.height)
    }

    pub fn is_rolling(&self) -> bool {
        self.is_rolling
    }

    pub fn jump_time(&self) -> f32 {
        self.jump_time
    }

    pub fn can_roll(&self) -> bool {
        self.can_roll_again && self.is_on_ground
    }

    /// Begin a roll if grounded and off cooldown
    pub fn try_start_roll(&mut self) -> bool {
        if !self.can_roll() {
            return false;
        }
        self.is_rolling = true;
        self.can_roll_again = false;
        true
    }

    /// Vertical velocity after the jump override. Returns whether a jump began.
    fn do_jump(&mut self, jumping: bool, velocity_y: f32, dt: f32) -> (f32, bool) {
        let mut velocity_y = velocity_y;
        let mut started = false;

        if jumping {
            if (!self.was_jumping && self.is_on_ground) || self.jump_time > 0.0 {
                started = self.jump_time == 0.0;
                self.jump_time += dt;
            }

            if 0.0 < self.jump_time && self.jump_time <= self.stats.max_jump_time {
                velocity_y = PhysicsSystem::jump_curve_velocity(self.jump_time, &self.stats);
            } else {
                // apex
                self.jump_time = 0.0;
            }
        } else {
            self.jump_time = 0.0;
        }
        self.was_jumping = jumping;

        (velocity_y, started)
    }

    /// Horizontal velocity after the roll override. Returns whether a roll began.
    fn do_roll(&mut self, direction: f32, velocity_x: f32, dt: f32) -> (f32, bool) {
        let mut velocity_x = velocity_x;
        let mut started = false;

        if self.is_rolling {
            if (!self.was_rolling && self.is_on_ground) || self.roll_time > 0.0 {
                started = self.roll_time == 0.0;
                self.roll_time += dt;
            }

            if 0.0 < self.roll_time && self.roll_time <= self.stats.max_roll_time {
                velocity_x = PhysicsSystem::roll_curve_velocity(self.roll_time, direction, &self.stats);
            } else {
                self.roll_time = 0.0;
                self.is_rolling = false;
            }
        } else {
            self.roll_time = 0.0;
        }
        self.was_rolling = self.is_rolling;

        if !self.can_roll_again {
            self.roll_rate_time += dt;
            if self.roll_rate_time > self.stats.roll_cooldown {
                self.roll_rate_time = 0.0;
                self.can_roll_again = true;
            }
        }

        (velocity_x, started)
    }
}

/// Stateless physics routines
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Vertical velocity during the powered part of a jump
    pub fn jump_curve_velocity(jump_time: f32, stats: &BodyStats) -> f32 {
        let t = (jump_time / stats.max_jump_time).clamp(0.0, 1.0);
        stats.jump_launch_velocity * (1.0 - t.powf(stats.jump_control_power))
    }

    /// Horizontal velocity during a roll
    pub fn roll_curve_velocity(roll_time: f32, direction: f32, stats: &BodyStats) -> f32 {
        let t = (roll_time / stats.max_roll_time).clamp(0.0, 1.0);
        direction * stats.max_move_speed * (1.0 - t.powf(stats.roll_control_power))
    }

    /// Advance a body by one tick.
    ///
    /// `blockers` are the boxes of other live bodies this one may not walk
    /// into; a rolling body passes through them.
    pub fn step(
        body: &mut KinematicBody,
        input: BodyInput,
        grid: &TileGrid,
        blockers: &[Rect],
        dt: f32,
    ) -> StepOutcome {
        let stats = body.stats;
        let previous_position = body.position;
        let movement = input.movement.clamp(-1.0, 1.0);

        body.velocity.x += movement * stats.move_acceleration * dt;
        body.velocity.y = (body.velocity.y + stats.gravity * dt)
            .clamp(-stats.max_fall_speed, stats.max_fall_speed);

        let (vy, jump_started) = body.do_jump(input.jump, body.velocity.y, dt);
        body.velocity.y = vy;

        body.velocity.x *= if body.is_on_ground {
            stats.ground_drag
        } else {
            stats.air_drag
        };
        body.velocity.x = body.velocity.x.clamp(-stats.max_move_speed, stats.max_move_speed);

        let (vx, roll_started) = body.do_roll(input.direction, body.velocity.x, dt);
        body.velocity.x = vx;

        body.position = (body.position + body.velocity * dt).rounded();

        if !body.is_rolling {
            let bounds = body.bounds();
            if blockers.iter().any(|b| bounds.intersects(b)) {
                let offset = if input.direction >= 0.0 { -1.0 } else { 1.0 };
                body.position = Vec2::new(previous_position.x + offset, previous_position.y);
            }
        }

        Self::resolve_tile_collisions(body, grid);

        if body.position.x == previous_position.x {
            body.velocity.x = 0.0;
        }
        if body.position.y == previous_position.y {
            body.velocity.y = 0.0;
        }

        StepOutcome {
            previous_position,
            jump_started,
            roll_started,
        }
    }

    /// Push a body out of every solid tile it overlaps.
    ///
    /// Tiles are visited top to bottom, left to right, and the box is
    /// recomputed after each correction. Platforms only stop a body whose
    /// previous bottom was at or above the platform top.
    pub fn resolve_tile_collisions(body: &mut KinematicBody, grid: &TileGrid) {
        let mut bounds = body.bounds();
        let (left, right, top, bottom) = grid.cells_overlapping(&bounds);

        body.is_on_ground = false;

        for y in top..=bottom {
            for x in left..=right {
                let collision = grid.classify(x, y);
                if collision == TileCollision::Passable {
                    continue;
                }

                let tile_bounds = grid.bounds_of(x, y);
                let depth = bounds.intersection_depth(&tile_bounds);
                if depth == Vec2::ZERO {
                    continue;
                }

                if depth.y.abs() < depth.x.abs() || collision == TileCollision::Platform {
                    if body.previous_bottom <= tile_bounds.top() as f32 {
                        body.is_on_ground = true;
                    }

                    if collision == TileCollision::Impassable || body.is_on_ground {
                        body.position.y += depth.y;
                        bounds = body.bounds();
                    }
                } else if collision == TileCollision::Impassable {
                    body.position.x += depth.x;
                    bounds = body.bounds();
                }
            }
        }

        body.previous_bottom = bounds.bottom() as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{parse_level, SpawnRules};

    const DT: f32 = 1.0 / 60.0;

    fn grid(text: &str) -> TileGrid {
        parse_level(text, SpawnRules::default()).unwrap().grid
    }

    fn combatant_at(x: f32, y: f32) -> KinematicBody {
        KinematicBody::new(Vec2::new(x, y), BodyStats::for_kind(BodyKind::Combatant))
    }

    fn settle(body: &mut KinematicBody, grid: &TileGrid, ticks: usize) {
        for _ in 0..ticks {
            PhysicsSystem::step(body, BodyInput { direction: 1.0, ..Default::default() }, grid, &[], DT);
        }
    }

    #[test]
    fn bounds_are_bottom_centred() {
        let body = combatant_at(100.0, 200.0);
        assert_eq!(body.bounds(), Rect::new(87, 149, 25, 51));
    }

    #[test]
    fn jump_curve_endpoints() {
        let stats = BodyStats::for_kind(BodyKind::Combatant);
        assert_eq!(PhysicsSystem::jump_curve_velocity(0.0, &stats), -3500.0);
        assert_eq!(PhysicsSystem::jump_curve_velocity(0.3, &stats), 0.0);
        let late = PhysicsSystem::jump_curve_velocity(0.299, &stats);
        assert!(late < 0.0 && late > -100.0);
    }

    #[test]
    fn body_lands_on_floor() {
        let g = grid("1....X\n......\n######");
        let mut body = combatant_at(60.0, 40.0);
        settle(&mut body, &g, 60);
        assert!(body.is_on_ground);
        assert_eq!(body.position.y, 64.0);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn left_edge_is_a_wall() {
        let g = grid("1....X\n......\n######");
        let mut body = combatant_at(60.0, 64.0);
        settle(&mut body, &g, 5);
        for _ in 0..60 {
            PhysicsSystem::step(
                &mut body,
                BodyInput { movement: -1.0, jump: false, direction: -1.0 },
                &g,
                &[],
                DT,
            );
        }
        assert_eq!(body.bounds().left(), 0);
    }

    #[test]
    fn platform_lets_body_through_from_below() {
        // Platform at row 1, floor at row 4
        let g = grid("1....X\n------\n......\n......\n######");
        let mut body = combatant_at(100.0, 128.0);
        settle(&mut body, &g, 5);
        assert!(body.is_on_ground);

        // jump up through the platform
        let mut min_y = body.position.y;
        for _ in 0..40 {
            PhysicsSystem::step(&mut body, BodyInput { movement: 0.0, jump: true, direction: 1.0 }, &g, &[], DT);
            min_y = min_y.min(body.position.y);
        }
        assert!(min_y < 64.0, "body should pass above the platform row, reached {min_y}");

        settle(&mut body, &g, 120);
        assert!(body.is_on_ground);
        assert_eq!(body.position.y, 32.0, "body should come to rest on the platform");
    }

    #[test]
    fn roll_has_cooldown() {
        let g = grid("1....X\n......\n######");
        let mut body = combatant_at(60.0, 64.0);
        settle(&mut body, &g, 5);
        assert!(body.try_start_roll());
        assert!(body.is_rolling());
        settle(&mut body, &g, 30);
        assert!(!body.is_rolling());
        assert!(!body.try_start_roll());
        settle(&mut body, &g, 120);
        assert!(body.try_start_roll());
    }

    #[test]
    fn blocked_by_other_body() {
        let g = grid("1.........X\n...........\n###########");
        let mut body = combatant_at(60.0, 64.0);
        settle(&mut body, &g, 5);
        let other = combatant_at(90.0, 64.0).bounds();
        for _ in 0..30 {
            PhysicsSystem::step(&mut body, BodyInput { movement: 1.0, jump: false, direction: 1.0 }, &g, &[other], DT);
        }
        assert!(!body.bounds().intersects(&other));
    }
}
