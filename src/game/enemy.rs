//! Scripted enemies: patrolling walkers and the Bowser boss

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::level::{EnemyKind, EnemySpawn, TileCollision, TileGrid, TILE_HEIGHT, TILE_WIDTH};
use crate::util::{Rect, Vec2};

use super::combat::{CombatSystem, Damageable, HitEvent, HitSource, MatchContext, TargetId, Weapon, WeaponKind};
use super::physics::{BodyInput, BodyKind, BodyStats, KinematicBody, PhysicsSystem};
use super::Facing;

const WALKER_SPEED: f32 = 64.0;
const WALKER_WAIT: f32 = 0.5;
const WALKER_HEALTH: f32 = 50.0;
const WALKER_SIZE: (i32, i32) = (22, 44);

const BOWSER_HEALTH: f32 = 300.0;
/// Seconds between decision re-rolls
const DECISION_INTERVAL: f32 = 1.0;
const WINDUP_TIME: f32 = 0.4;
/// Half-width of the band around the preferred distance
const DISTANCE_SLACK: f32 = 40.0;
const PULSE_TIME: f32 = 0.4;

/// Health, hit flash and liveness shared by every enemy
#[derive(Debug, Clone)]
struct Vitals {
    health: f32,
    alive: bool,
    pulse_red: bool,
    pulse_time: f32,
}

impl Vitals {
    fn new(health: f32) -> Self {
        Self {
            health,
            alive: true,
            pulse_red: false,
            pulse_time: 0.0,
        }
    }

    fn hurt(&mut self, damage: f32) -> bool {
        let (health, killed) = CombatSystem::apply_damage(self.health, damage);
        self.health = health;
        self.pulse_red = true;
        self.pulse_time = 0.0;
        if killed {
            self.alive = false;
        }
        killed
    }

    fn tick_pulse(&mut self, dt: f32) {
        if self.pulse_red {
            self.pulse_time += dt;
            if self.pulse_time > PULSE_TIME {
                self.pulse_red = false;
                self.pulse_time = 0.0;
            }
        }
    }
}

/// Basic enemy that walks a ledge back and forth
#[derive(Debug, Clone)]
pub struct Walker {
    pub kind: EnemyKind,
    /// Bottom-centre
    pub position: Vec2,
    pub facing: Facing,
    wait_time: f32,
    vitals: Vitals,
}

impl Walker {
    pub fn new(kind: EnemyKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            facing: Facing::Left,
            wait_time: 0.0,
            vitals: Vitals::new(WALKER_HEALTH),
        }
    }

    pub fn bounds(&self) -> Rect {
        let (w, h) = WALKER_SIZE;
        Rect::new(
            self.position.x.round() as i32 - (w + 1) / 2,
            self.position.y.round() as i32 - h,
            w,
            h,
        )
    }

    /// Walk until a wall or a drop is ahead, pause, then turn around
    pub fn patrol(&mut self, grid: &TileGrid, dt: f32) {
        self.vitals.tick_pulse(dt);

        let dir = self.facing.sign();
        let step = dir as i32;
        let ahead_x = self.position.x + (WALKER_SIZE.0 / 2) as f32 * dir;
        let tile_x = (ahead_x / TILE_WIDTH as f32).floor() as i32 - step;
        let tile_y = (self.position.y / TILE_HEIGHT as f32).floor() as i32;

        if self.wait_time > 0.0 {
            self.wait_time = (self.wait_time - dt).max(0.0);
            if self.wait_time <= 0.0 {
                self.facing = match self.facing {
                    Facing::Left => Facing::Right,
                    Facing::Right => Facing::Left,
                };
            }
            return;
        }

        let wall = grid.classify(tile_x + step, tile_y - 1) == TileCollision::Impassable;
        let ledge = grid.classify(tile_x + step, tile_y) == TileCollision::Passable;
        if wall || ledge {
            self.wait_time = WALKER_WAIT;
        } else {
            self.position.x += dir * WALKER_SPEED * dt;
        }
    }
}

/// Boss decision states
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BowserState {
    Idle,
    /// Closing or opening distance to the preferred band
    Running,
    /// Jump held for `held` seconds so far
    Jumping { held: f32 },
    /// Seconds until the breath is released
    AttackWindup { remaining: f32 },
}

/// Chase behaviour for enemies that track the attacker
pub trait Pursuer {
    /// Advance the AI one tick toward combatant `attacker`, idling while it
    /// is out of play. Returns true when the enemy wants to attack this tick.
    fn pursue(&mut self, attacker: usize, ctx: &mut MatchContext<'_>) -> bool;

    /// The ranged weapon the pursuer attacks with
    fn breath(&mut self) -> &mut Weapon;

    /// Attack origin and facing sign
    fn aim(&self) -> (Vec2, f32);
}

/// The boss: a heavy body with a fire breath, driven by a timed random re-roll
#[derive(Debug, Clone)]
pub struct Bowser {
    pub body: KinematicBody,
    pub facing: Facing,
    pub state: BowserState,
    wait_time: f32,
    preferred_distance: f32,
    breath: Weapon,
    vitals: Vitals,
}

impl Bowser {
    pub fn new(position: Vec2) -> Self {
        Self {
            body: KinematicBody::new(position, BodyStats::for_kind(BodyKind::Bowser)),
            facing: Facing::Left,
            state: BowserState::Idle,
            wait_time: 0.0,
            preferred_distance: 250.0,
            breath: Weapon::new(WeaponKind::Fire),
            vitals: Vitals::new(BOWSER_HEALTH),
        }
    }

    pub fn preferred_distance(&self) -> f32 {
        self.preferred_distance
    }

    pub fn breath_weapon(&self) -> &Weapon {
        &self.breath
    }

    /// Stand-in left in the enemy list while the real boss is being updated
    fn dormant() -> Self {
        let mut boss = Self::new(Vec2::ZERO);
        boss.vitals.alive = false;
        boss
    }

    fn reroll<R: Rng>(&mut self, rng: &mut R) {
        self.preferred_distance = rng.gen_range(150.0..350.0);
        let roll: u32 = rng.gen_range(0..100);
        self.state = if roll < 25 && self.body.is_on_ground {
            BowserState::Jumping { held: 0.0 }
        } else if roll < 55 {
            BowserState::AttackWindup {
                remaining: WINDUP_TIME,
            }
        } else {
            BowserState::Running
        };
    }
}

impl Pursuer for Bowser {
    fn pursue(&mut self, attacker: usize, ctx: &mut MatchContext<'_>) -> bool {
        if !self.vitals.alive {
            return false;
        }
        let dt = ctx.dt;
        self.vitals.tick_pulse(dt);

        self.wait_time += dt;
        if self.wait_time >= DECISION_INTERVAL {
            self.wait_time = 0.0;
            self.reroll(&mut *ctx.rng);
        }

        let target = ctx
            .combatants
            .get(attacker)
            .filter(|c| c.in_play())
            .map(|c| c.body.position);

        let dx = target.map(|t| t.x - self.body.position.x).unwrap_or(0.0);
        if target.is_some() {
            self.facing = Facing::toward(dx);
        }
        let toward = if dx < 0.0 { -1.0 } else { 1.0 };

        let mut movement = 0.0;
        let mut jump = false;
        let mut attack = false;
        match self.state {
            BowserState::Idle => {}
            BowserState::Running => {
                let distance = dx.abs();
                if target.is_none() {
                    self.state = BowserState::Idle;
                } else if distance > self.preferred_distance + DISTANCE_SLACK {
                    movement = toward;
                } else if distance < self.preferred_distance - DISTANCE_SLACK {
                    movement = -toward;
                } else {
                    self.state = BowserState::Idle;
                }
            }
            BowserState::Jumping { held } => {
                jump = true;
                if target.is_some() {
                    movement = toward;
                }
                let held = held + dt;
                self.state = if held >= self.body.stats.max_jump_time {
                    BowserState::Idle
                } else {
                    BowserState::Jumping { held }
                };
            }
            BowserState::AttackWindup { remaining } => {
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    attack = target.is_some();
                    self.state = BowserState::Idle;
                } else {
                    self.state = BowserState::AttackWindup { remaining };
                }
            }
        }

        let input = BodyInput {
            movement,
            jump,
            direction: self.facing.sign(),
        };
        PhysicsSystem::step(&mut self.body, input, ctx.grid, &[], dt);
        attack
    }

    fn breath(&mut self) -> &mut Weapon {
        &mut self.breath
    }

    fn aim(&self) -> (Vec2, f32) {
        (self.body.position, self.facing.sign())
    }
}

/// Every enemy the level can place
#[derive(Debug, Clone)]
pub enum Enemy {
    Walker { index: usize, walker: Walker },
    Bowser { index: usize, boss: Box<Bowser> },
}

impl Enemy {
    pub fn spawn(index: usize, spawn: &EnemySpawn) -> Self {
        match spawn.kind {
            EnemyKind::Bowser => Enemy::Bowser {
                index,
                boss: Box::new(Bowser::new(spawn.position)),
            },
            kind => Enemy::Walker {
                index,
                walker: Walker::new(kind, spawn.position),
            },
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Enemy::Walker { index, .. } | Enemy::Bowser { index, .. } => *index,
        }
    }

    pub fn kind(&self) -> EnemyKind {
        match self {
            Enemy::Walker { walker, .. } => walker.kind,
            Enemy::Bowser { .. } => EnemyKind::Bowser,
        }
    }

    fn vitals(&self) -> &Vitals {
        match self {
            Enemy::Walker { walker, .. } => &walker.vitals,
            Enemy::Bowser { boss, .. } => &boss.vitals,
        }
    }

    fn vitals_mut(&mut self) -> &mut Vitals {
        match self {
            Enemy::Walker { walker, .. } => &mut walker.vitals,
            Enemy::Bowser { boss, .. } => &mut boss.vitals,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.vitals().alive
    }

    pub fn health(&self) -> f32 {
        self.vitals().health
    }

    pub fn pulse_red(&self) -> bool {
        self.vitals().pulse_red
    }

    pub fn position(&self) -> Vec2 {
        match self {
            Enemy::Walker { walker, .. } => walker.position,
            Enemy::Bowser { boss, .. } => boss.body.position,
        }
    }

    pub fn facing(&self) -> Facing {
        match self {
            Enemy::Walker { walker, .. } => walker.facing,
            Enemy::Bowser { boss, .. } => boss.facing,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Enemy::Walker { walker, .. } => walker.bounds(),
            Enemy::Bowser { boss, .. } => boss.body.bounds(),
        }
    }

    /// Patrol step for walkers; pursuers are driven through [`Enemy::take_bowser`]
    pub fn patrol(&mut self, grid: &TileGrid, dt: f32) {
        if let Enemy::Walker { walker, .. } = self {
            if walker.vitals.alive {
                walker.patrol(grid, dt);
            }
        }
    }

    /// Move the boss out for its update, leaving a dormant stand-in that
    /// cannot be hit. Put it back with [`Enemy::restore_bowser`].
    pub fn take_bowser(&mut self) -> Option<Bowser> {
        match self {
            Enemy::Bowser { boss, .. } => Some(std::mem::replace(&mut **boss, Bowser::dormant())),
            Enemy::Walker { .. } => None,
        }
    }

    pub fn restore_bowser(&mut self, bowser: Bowser) {
        if let Enemy::Bowser { boss, .. } = self {
            **boss = bowser;
        }
    }

    pub fn as_bowser(&self) -> Option<&Bowser> {
        match self {
            Enemy::Bowser { boss, .. } => Some(&**boss),
            Enemy::Walker { .. } => None,
        }
    }
}

impl Damageable for Enemy {
    fn target_id(&self) -> TargetId {
        TargetId::Enemy(self.index())
    }

    fn hit_bounds(&self) -> Rect {
        self.bounds()
    }

    fn can_be_hit(&self) -> bool {
        self.is_alive()
    }

    fn take_hit(&mut self, damage: f32, from_direction: f32, source: HitSource) -> HitEvent {
        let killed = self.vitals_mut().hurt(damage);
        HitEvent {
            target: self.target_id(),
            source,
            damage,
            from_direction,
            killed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Combatant;
    use crate::level::{parse_level, SpawnRules};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const LEDGE: &str = "\
......
1.A..X
.####.";

    fn walker_level() -> (TileGrid, Enemy) {
        let layout = parse_level(LEDGE, SpawnRules::default()).unwrap();
        let enemy = Enemy::spawn(0, &layout.enemies[0]);
        (layout.grid, enemy)
    }

    #[test]
    fn walker_turns_at_ledge() {
        let (grid, mut enemy) = walker_level();
        let dt = 1.0 / 60.0;
        let start = enemy.position().x;
        let mut turned = false;
        for _ in 0..240 {
            enemy.patrol(&grid, dt);
            if enemy.facing() == Facing::Right {
                turned = true;
                break;
            }
        }
        assert!(turned);
        // stopped over the floor, not past the ledge
        assert!(enemy.position().x < start);
        assert!(enemy.position().x > 40.0);
    }

    #[test]
    fn walker_dies_after_two_bullets() {
        let (_, mut enemy) = walker_level();
        let first = enemy.take_hit(25.0, 1.0, HitSource::Combatant(0));
        assert!(!first.killed);
        assert!(enemy.pulse_red());
        let second = enemy.take_hit(25.0, 1.0, HitSource::Combatant(0));
        assert!(second.killed);
        assert!(!enemy.can_be_hit());
        assert_eq!(second.target, TargetId::Enemy(0));
    }

    #[test]
    fn bowser_faces_target_and_lands() {
        let text = "\
..............................
1..........................XE.
##############################";
        let layout = parse_level(text, SpawnRules::default()).unwrap();
        let mut enemy = Enemy::spawn(0, &layout.enemies[0]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut combatants = vec![Combatant::new(0, Some(Vec2::new(20.0, 64.0)))];
        let mut others: Vec<Enemy> = Vec::new();

        let mut boss = enemy.take_bowser().unwrap();
        assert!(!enemy.can_be_hit());
        let mut ctx = MatchContext {
            grid: &layout.grid,
            rng: &mut rng,
            combatants: &mut combatants,
            enemies: &mut others,
            dt: 1.0 / 60.0,
        };
        for _ in 0..30 {
            boss.pursue(0, &mut ctx);
        }
        let (_, dir) = boss.aim();
        assert_eq!(dir, -1.0);

        enemy.restore_bowser(boss);
        assert!(enemy.can_be_hit());
        // standing on the floor row
        assert_eq!(enemy.position().y, 64.0);
    }

    #[test]
    fn bowser_idles_without_a_target() {
        let text = "\
..........
1.......XE
##########";
        let layout = parse_level(text, SpawnRules::default()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut benched = vec![Combatant::new(0, None)];
        let mut others: Vec<Enemy> = Vec::new();
        let mut boss = Bowser::new(layout.enemies[0].position);
        boss.state = BowserState::AttackWindup { remaining: 0.01 };

        let mut ctx = MatchContext {
            grid: &layout.grid,
            rng: &mut rng,
            combatants: &mut benched,
            enemies: &mut others,
            dt: 1.0 / 60.0,
        };
        assert!(!boss.pursue(0, &mut ctx));
        assert_eq!(boss.state, BowserState::Idle);
    }

    #[test]
    fn walkers_are_not_pursuers() {
        let (_, mut enemy) = walker_level();
        assert!(enemy.take_bowser().is_none());
        assert!(enemy.as_bowser().is_none());
    }
}
