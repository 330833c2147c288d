//! Combat system - weapons, projectile pools, hit detection

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::level::{TileCollision, TileGrid};
use crate::util::{Rect, Vec2};

use super::combatant::Combatant;
use super::enemy::Enemy;
use super::events::{GameEvent, SoundCue};

/// Largest projectile pool any weapon carries
pub const MAX_POOL: usize = 4;

/// Downward acceleration on thrown grenades
const GRENADE_GRAVITY: f32 = 900.0;
/// How long a blast stays dangerous
const EXPLOSION_TIME: f32 = 0.5;
const EXPLOSION_SIZE: i32 = 96;
/// Longest useful grenade charge
pub const MAX_GRENADE_CHARGE: f32 = 1.0;

/// Closed set of weapons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    #[default]
    Handgun,
    Shotgun,
    Knife,
    Grenade,
    /// Bowser's breath
    Fire,
}

impl WeaponKind {
    /// Next weapon in the switch cycle
    pub fn next(self) -> Self {
        match self {
            WeaponKind::Handgun => WeaponKind::Shotgun,
            WeaponKind::Shotgun => WeaponKind::Knife,
            _ => WeaponKind::Handgun,
        }
    }
}

/// How far a weapon's attack reaches before it expires
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reach {
    /// Flies straight until this many seconds have passed
    Lifetime(f32),
    /// Flies straight until this many pixels are covered
    Distance(f32),
    /// Melee window in seconds
    Swing(f32),
    /// Thrown along a gravity arc, bursting after this many seconds
    Fuse(f32),
}

/// Weapon tunables per kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    /// Seconds between attacks
    pub cooldown: f32,
    /// Simultaneous live projectiles
    pub capacity: usize,
    /// Damage per hit
    pub damage: f32,
    /// Projectile speed (px/s), or peak throw speed for grenades
    pub speed: f32,
    pub reach: Reach,
    /// Spawn point relative to the owner's feet when facing right
    pub spawn_offset: Vec2,
    /// Hit box (width, height)
    pub hitbox: (i32, i32),
    /// Whether attacks also strike enemies
    pub hits_enemies: bool,
    /// Whether solid tiles stop the projectile
    pub blocked_by_tiles: bool,
    pub cue: SoundCue,
}

impl WeaponStats {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::Handgun => Self {
                cooldown: 0.18,
                capacity: 4,
                damage: 25.0,
                speed: 600.0,
                reach: Reach::Lifetime(0.3),
                spawn_offset: Vec2::new(43.0, -28.0),
                hitbox: (8, 6),
                hits_enemies: true,
                blocked_by_tiles: true,
                cue: SoundCue::PistolShot,
            },
            WeaponKind::Shotgun => Self {
                cooldown: 0.4,
                capacity: 2,
                damage: 50.0,
                speed: 600.0,
                reach: Reach::Distance(40.0),
                spawn_offset: Vec2::new(37.0, -26.0),
                hitbox: (16, 12),
                hits_enemies: true,
                blocked_by_tiles: true,
                cue: SoundCue::ShotgunShot,
            },
            WeaponKind::Knife => Self {
                cooldown: 3.0,
                capacity: 0,
                damage: 30.0,
                speed: 0.0,
                reach: Reach::Swing(0.3),
                spawn_offset: Vec2::new(30.0, -22.0),
                hitbox: (20, 10),
                hits_enemies: true,
                blocked_by_tiles: false,
                cue: SoundCue::KnifeSwing,
            },
            WeaponKind::Grenade => Self {
                cooldown: 1.5,
                capacity: 1,
                damage: 100.0,
                speed: 450.0,
                reach: Reach::Fuse(2.0),
                spawn_offset: Vec2::new(20.0, -30.0),
                hitbox: (10, 10),
                hits_enemies: true,
                blocked_by_tiles: true,
                cue: SoundCue::GrenadeThrow,
            },
            WeaponKind::Fire => Self {
                cooldown: 0.8,
                capacity: 4,
                damage: 35.0,
                speed: 100.0,
                reach: Reach::Lifetime(4.0),
                spawn_offset: Vec2::new(35.0, -50.0),
                hitbox: (24, 38),
                hits_enemies: false,
                blocked_by_tiles: false,
                cue: SoundCue::FireBreath,
            },
        }
    }
}

/// Who dealt a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSource {
    Combatant(usize),
    Enemy(usize),
    /// Hazards, falls and enemy contact
    Environment,
}

/// Who received a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetId {
    Combatant(usize),
    Enemy(usize),
}

/// Result of a landed hit, consumed by the match in the same tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    pub target: TargetId,
    pub source: HitSource,
    pub damage: f32,
    /// +1 when struck from the left (pushed right), -1 otherwise
    pub from_direction: f32,
    pub killed: bool,
}

/// Anything weapons can hurt
pub trait Damageable {
    fn target_id(&self) -> TargetId;
    fn hit_bounds(&self) -> Rect;
    /// False while dead or invulnerable
    fn can_be_hit(&self) -> bool;
    fn take_hit(&mut self, damage: f32, from_direction: f32, source: HitSource) -> HitEvent;
}

/// Mutable view of the world handed to weapons and AI for one update
pub struct MatchContext<'a> {
    pub grid: &'a TileGrid,
    pub rng: &'a mut ChaCha8Rng,
    pub combatants: &'a mut [Combatant],
    pub enemies: &'a mut [Enemy],
    pub dt: f32,
}

impl MatchContext<'_> {
    fn is_owner(owner: HitSource, target: TargetId) -> bool {
        matches!(
            (owner, target),
            (HitSource::Combatant(a), TargetId::Combatant(b)) | (HitSource::Enemy(a), TargetId::Enemy(b)) if a == b
        )
    }

    /// Every hittable target overlapping `area`, combatants first, in index order
    pub fn targets_in(
        &self,
        area: &Rect,
        owner: HitSource,
        include_enemies: bool,
        skip: &[TargetId],
    ) -> Vec<TargetId> {
        let combatants = self.combatants.iter().map(|c| c as &dyn Damageable);
        let enemies = self
            .enemies
            .iter()
            .filter(|_| include_enemies)
            .map(|e| e as &dyn Damageable);

        combatants
            .chain(enemies)
            .filter(|t| {
                let id = t.target_id();
                !Self::is_owner(owner, id)
                    && !skip.contains(&id)
                    && t.can_be_hit()
                    && t.hit_bounds().intersects(area)
            })
            .map(|t| t.target_id())
            .collect()
    }

    /// First hittable target overlapping `area`
    pub fn first_target(&self, area: &Rect, owner: HitSource, include_enemies: bool) -> Option<TargetId> {
        self.targets_in(area, owner, include_enemies, &[]).into_iter().next()
    }

    /// Apply damage to a target. Returns `None` when the target cannot be hit.
    pub fn strike(
        &mut self,
        target: TargetId,
        damage: f32,
        from_direction: f32,
        source: HitSource,
    ) -> Option<HitEvent> {
        let victim: &mut dyn Damageable = match target {
            TargetId::Combatant(i) => self.combatants.get_mut(i)? as &mut dyn Damageable,
            TargetId::Enemy(i) => self.enemies.get_mut(i)? as &mut dyn Damageable,
        };
        if !victim.can_be_hit() {
            return None;
        }
        Some(victim.take_hit(damage, from_direction, source))
    }
}

/// One pool slot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Projectile {
    pub alive: bool,
    /// Centre of the hit box
    pub position: Vec2,
    pub velocity: Vec2,
    pub time_alive: f32,
    pub travelled: f32,
}

impl Projectile {
    pub fn bounds(&self, hitbox: (i32, i32)) -> Rect {
        let (w, h) = hitbox;
        Rect::new(
            self.position.x.round() as i32 - w / 2,
            self.position.y.round() as i32 - h / 2,
            w,
            h,
        )
    }
}

#[derive(Debug, Clone, Default)]
struct Swing {
    time: f32,
    struck: Vec<TargetId>,
}

/// Lingering grenade blast
#[derive(Debug, Clone, Default)]
pub struct Explosion {
    pub position: Vec2,
    time_left: f32,
    struck: Vec<TargetId>,
}

impl Explosion {
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x.round() as i32 - EXPLOSION_SIZE / 2,
            self.position.y.round() as i32 - EXPLOSION_SIZE / 2,
            EXPLOSION_SIZE,
            EXPLOSION_SIZE,
        )
    }
}

/// A weapon instance with its own cooldown and projectile pool
#[derive(Debug, Clone)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub stats: WeaponStats,
    cooldown: f32,
    pool: [Projectile; MAX_POOL],
    swing: Option<Swing>,
    explosion: Option<Explosion>,
    charge: f32,
}

impl Default for Weapon {
    fn default() -> Self {
        Self::new(WeaponKind::default())
    }
}

impl Weapon {
    pub fn new(kind: WeaponKind) -> Self {
        Self {
            kind,
            stats: WeaponStats::for_kind(kind),
            cooldown: 0.0,
            pool: [Projectile::default(); MAX_POOL],
            swing: None,
            explosion: None,
            charge: 0.0,
        }
    }

    fn slots(&self) -> &[Projectile] {
        &self.pool[..self.stats.capacity.min(MAX_POOL)]
    }

    fn slots_mut(&mut self) -> &mut [Projectile] {
        let capacity = self.stats.capacity.min(MAX_POOL);
        &mut self.pool[..capacity]
    }

    pub fn live_projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.slots().iter().filter(|p| p.alive)
    }

    pub fn live_count(&self) -> usize {
        self.live_projectiles().count()
    }

    pub fn explosion(&self) -> Option<&Explosion> {
        self.explosion.as_ref()
    }

    pub fn is_swinging(&self) -> bool {
        self.swing.is_some()
    }

    pub fn charge(&self) -> f32 {
        self.charge
    }

    /// Off cooldown and not mid-swing
    pub fn is_ready(&self) -> bool {
        CombatSystem::can_fire(self.cooldown) && self.swing.is_none()
    }

    /// Accumulate throw charge, capped at one second
    pub fn charge_up(&mut self, dt: f32) {
        self.charge = (self.charge + dt).min(MAX_GRENADE_CHARGE);
    }

    /// Attack from `origin` (owner's feet) facing `direction`.
    ///
    /// A no-op returning false while on cooldown or with every pool slot busy.
    pub fn fire(&mut self, origin: Vec2, direction: f32) -> bool {
        if !self.is_ready() {
            return false;
        }

        let spawn = origin + CombatSystem::mirrored(self.stats.spawn_offset, direction);
        match self.stats.reach {
            Reach::Swing(_) => {
                self.swing = Some(Swing::default());
            }
            reach => {
                let speed = self.stats.speed;
                let charge = self.charge / MAX_GRENADE_CHARGE;
                let Some(slot) = self.slots_mut().iter_mut().find(|p| !p.alive) else {
                    return false;
                };
                let velocity = match reach {
                    Reach::Fuse(_) => {
                        let power = 0.4 + 0.6 * charge;
                        Vec2::new(direction * speed * power, -speed * 0.6 * power)
                    }
                    _ => Vec2::new(direction * speed, 0.0),
                };
                *slot = Projectile {
                    alive: true,
                    position: spawn,
                    velocity,
                    time_alive: 0.0,
                    travelled: 0.0,
                };
            }
        }

        self.charge = 0.0;
        self.cooldown = CombatSystem::fire_cooldown(&self.stats);
        true
    }

    /// Drop every live attack. The cooldown keeps running.
    pub fn reset(&mut self) {
        for p in self.slots_mut() {
            p.alive = false;
        }
        self.swing = None;
        self.explosion = None;
        self.charge = 0.0;
    }

    /// Advance cooldown, swing, projectiles and blast by one tick
    pub fn update(
        &mut self,
        owner: HitSource,
        origin: Vec2,
        direction: f32,
        ctx: &mut MatchContext<'_>,
        events: &mut Vec<GameEvent>,
    ) -> Vec<HitEvent> {
        let dt = ctx.dt;
        let stats = self.stats;
        let mut hits = Vec::new();

        self.cooldown = CombatSystem::update_cooldown(self.cooldown, dt);

        if let (Some(swing), Reach::Swing(window)) = (self.swing.as_mut(), stats.reach) {
            swing.time += dt;
            if swing.time > window {
                self.swing = None;
            } else {
                let centre = origin + CombatSystem::mirrored(stats.spawn_offset, direction);
                let area = Rect::new(
                    centre.x.round() as i32 - stats.hitbox.0 / 2,
                    centre.y.round() as i32 - stats.hitbox.1 / 2,
                    stats.hitbox.0,
                    stats.hitbox.1,
                );
                for target in ctx.targets_in(&area, owner, stats.hits_enemies, &swing.struck) {
                    swing.struck.push(target);
                    hits.extend(ctx.strike(target, stats.damage, direction, owner));
                }
            }
        }

        let capacity = stats.capacity.min(MAX_POOL);
        for slot in 0..capacity {
            let mut p = self.pool[slot];
            if !p.alive {
                continue;
            }
            p.time_alive += dt;
            let heading = if p.velocity.x >= 0.0 { 1.0 } else { -1.0 };

            match stats.reach {
                Reach::Fuse(fuse) => {
                    p.velocity.y += GRENADE_GRAVITY * dt;
                    p.position += p.velocity * dt;
                    let bounds = p.bounds(stats.hitbox);
                    let burst = p.time_alive > fuse
                        || ctx.grid.is_solid_at(&bounds)
                        || ctx.first_target(&bounds, owner, stats.hits_enemies).is_some();
                    if burst {
                        p.alive = false;
                        self.explosion = Some(Explosion {
                            position: p.position,
                            time_left: EXPLOSION_TIME,
                            struck: Vec::new(),
                        });
                        events.push(GameEvent::GrenadeExploded {
                            x: p.position.x,
                            y: p.position.y,
                        });
                        events.push(GameEvent::Sound {
                            cue: SoundCue::Explosion,
                        });
                    }
                }
                reach => {
                    let step = p.velocity.x * dt;
                    p.position.x += step;
                    p.travelled += step.abs();
                    let expired = match reach {
                        Reach::Lifetime(ttl) => p.time_alive > ttl,
                        Reach::Distance(max) => p.travelled > max,
                        _ => false,
                    };
                    let bounds = p.bounds(stats.hitbox);
                    if expired || (stats.blocked_by_tiles && CombatSystem::hits_wall(ctx.grid, &bounds)) {
                        p.alive = false;
                    } else if let Some(target) = ctx.first_target(&bounds, owner, stats.hits_enemies) {
                        hits.extend(ctx.strike(target, stats.damage, heading, owner));
                        p.alive = false;
                    }
                }
            }
            self.pool[slot] = p;
        }

        if let Some(blast) = self.explosion.as_mut() {
            blast.time_left -= dt;
            if blast.time_left <= 0.0 {
                self.explosion = None;
            } else {
                let area = blast.bounds();
                for target in ctx.targets_in(&area, owner, stats.hits_enemies, &blast.struck) {
                    blast.struck.push(target);
                    hits.extend(ctx.strike(target, stats.damage, direction, owner));
                }
            }
        }

        hits
    }
}

/// What the owner asked its arsenal to do this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeaponOrders {
    pub fire: bool,
    pub throw_grenade: bool,
}

/// A combatant's weapons: three switchable plus a grenade
#[derive(Debug, Clone)]
pub struct Arsenal {
    handgun: Weapon,
    shotgun: Weapon,
    knife: Weapon,
    grenade: Weapon,
    active: WeaponKind,
}

impl Default for Arsenal {
    fn default() -> Self {
        Self {
            handgun: Weapon::new(WeaponKind::Handgun),
            shotgun: Weapon::new(WeaponKind::Shotgun),
            knife: Weapon::new(WeaponKind::Knife),
            grenade: Weapon::new(WeaponKind::Grenade),
            active: WeaponKind::Handgun,
        }
    }
}

impl Arsenal {
    pub fn active_kind(&self) -> WeaponKind {
        self.active
    }

    pub fn weapon(&self, kind: WeaponKind) -> Option<&Weapon> {
        match kind {
            WeaponKind::Handgun => Some(&self.handgun),
            WeaponKind::Shotgun => Some(&self.shotgun),
            WeaponKind::Knife => Some(&self.knife),
            WeaponKind::Grenade => Some(&self.grenade),
            WeaponKind::Fire => None,
        }
    }

    fn weapon_mut(&mut self, kind: WeaponKind) -> Option<&mut Weapon> {
        match kind {
            WeaponKind::Handgun => Some(&mut self.handgun),
            WeaponKind::Shotgun => Some(&mut self.shotgun),
            WeaponKind::Knife => Some(&mut self.knife),
            WeaponKind::Grenade => Some(&mut self.grenade),
            WeaponKind::Fire => None,
        }
    }

    pub fn active(&self) -> &Weapon {
        self.weapon(self.active).unwrap_or(&self.handgun)
    }

    pub fn grenade(&self) -> &Weapon {
        &self.grenade
    }

    pub fn grenade_mut(&mut self) -> &mut Weapon {
        &mut self.grenade
    }

    /// Switch to a weapon, clearing the one put away
    pub fn select(&mut self, kind: WeaponKind) {
        if kind == self.active || matches!(kind, WeaponKind::Grenade | WeaponKind::Fire) {
            return;
        }
        if let Some(current) = self.weapon_mut(self.active) {
            current.reset();
        }
        self.active = kind;
    }

    /// Cycle handgun, shotgun, knife
    pub fn switch_next(&mut self) {
        self.select(self.active.next());
    }

    /// Clear every weapon, as on death
    pub fn reset_all(&mut self) {
        self.handgun.reset();
        self.shotgun.reset();
        self.knife.reset();
        self.grenade.reset();
    }

    /// Carry out orders and advance every weapon.
    ///
    /// The arsenal must be taken out of `ctx.combatants[owner]` for the
    /// duration of this call.
    pub fn update(
        &mut self,
        owner: usize,
        orders: WeaponOrders,
        ctx: &mut MatchContext<'_>,
        events: &mut Vec<GameEvent>,
    ) -> Vec<HitEvent> {
        let Some(me) = ctx.combatants.get(owner) else {
            return Vec::new();
        };
        let origin = me.body.position;
        let direction = me.facing.sign();
        let source = HitSource::Combatant(owner);

        if orders.throw_grenade && self.grenade.fire(origin, direction) {
            events.push(GameEvent::Shot {
                shooter: source,
                weapon: WeaponKind::Grenade,
                x: origin.x,
                y: origin.y,
            });
            events.push(GameEvent::Sound {
                cue: self.grenade.stats.cue,
            });
        } else if orders.fire {
            let kind = self.active;
            if let Some(weapon) = self.weapon_mut(kind) {
                if weapon.fire(origin, direction) {
                    let cue = weapon.stats.cue;
                    events.push(GameEvent::Shot {
                        shooter: source,
                        weapon: kind,
                        x: origin.x,
                        y: origin.y,
                    });
                    events.push(GameEvent::Sound { cue });
                }
            }
        }

        let mut hits = Vec::new();
        for weapon in [&mut self.handgun, &mut self.shotgun, &mut self.knife, &mut self.grenade] {
            hits.extend(weapon.update(source, origin, direction, ctx, events));
        }
        hits
    }
}

/// Shared combat arithmetic
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a weapon can fire (cooldown check)
    pub fn can_fire(weapon_cooldown: f32) -> bool {
        weapon_cooldown <= 0.0
    }

    /// Advance a cooldown towards zero
    pub fn update_cooldown(cooldown: f32, dt: f32) -> f32 {
        (cooldown - dt).max(0.0)
    }

    /// Get cooldown to set after firing
    pub fn fire_cooldown(stats: &WeaponStats) -> f32 {
        stats.cooldown
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }

    /// Flip an offset to the owner's facing
    pub fn mirrored(offset: Vec2, direction: f32) -> Vec2 {
        Vec2::new(offset.x * direction.signum(), offset.y)
    }

    /// Bullets stop on impassable tiles only; platforms let them through
    pub fn hits_wall(grid: &TileGrid, bounds: &Rect) -> bool {
        let (left, right, top, bottom) = grid.cells_overlapping(bounds);
        (top..=bottom).any(|y| {
            (left..=right).any(|x| grid.classify(x, y) == TileCollision::Impassable)
        })
    }
}
