//! Level state and the authoritative per-tick update

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::level::{parse_level, LevelError, SpawnRules, TileGrid, TILE_HEIGHT, TILE_WIDTH};
use crate::util::time::countdown;
use crate::util::{Rect, Vec2};

use super::camera::Camera;
use super::combat::{Damageable, HitEvent, HitSource, MatchContext, TargetId, WeaponKind};
use super::combatant::{Combatant, KillRecord};
use super::enemy::{Enemy, Pursuer};
use super::events::{DeathCause, GameEvent, KillStreakTier, SoundCue};
use super::{Facing, InputCommand};

/// Seconds on the level clock
pub const LEVEL_TIME: f32 = 120.0;
const LOADING_TIME: f32 = 0.5;
/// Seconds a corpse lingers before the combatant comes back
const RESPAWN_DELAY: f32 = 0.5;
/// Respawns drop in this far above the death height
const RESPAWN_LIFT: f32 = 100.0;
const CORPSE_SLOTS: usize = 10;

pub const GEM_POINTS: u32 = 30;
const GEM_RADIUS: f32 = TILE_WIDTH as f32 / 3.0;

const HAZARD_SIZE: (i32, i32) = (14, 22);
const HAZARD_DAMAGE: f32 = 100.0;

/// Delay between two bridge tiles falling away
const BRIDGE_STEP: f32 = 0.1;
/// Score for each second left on the clock at the exit
const POINTS_PER_SECOND: u32 = 5;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Short pause after the level is built
    Loading,
    /// Combatants are fighting
    Active,
    /// Attacker stands on its exit; remaining time is tallied into score
    ExitReached,
    /// Tally finished, ready for the next level
    Completed,
    /// Attacker reached the win tile of a boss level
    Victory,
    /// Attacker died in a boss level
    Defeat,
}

impl MatchPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, MatchPhase::Completed | MatchPhase::Victory | MatchPhase::Defeat)
    }
}

/// What the campaign tells a new level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSetup {
    pub index: usize,
    pub attacker: usize,
    pub first_kill: bool,
    pub boss_level: bool,
    pub viewport_width: f32,
    pub seed: u64,
    /// Streaks and kill totals carried over from the previous level
    pub records: [KillRecord; 2],
}

impl Default for MatchSetup {
    fn default() -> Self {
        Self {
            index: 0,
            attacker: 0,
            first_kill: false,
            boss_level: false,
            viewport_width: 800.0,
            seed: 0,
            records: [KillRecord::default(); 2],
        }
    }
}

/// Where a combatant fell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corpse {
    pub position: Vec2,
    pub facing: Facing,
}

/// Fixed ring of death markers, oldest overwritten first
#[derive(Debug, Clone, Default)]
pub struct CorpseRing {
    slots: [Option<Corpse>; CORPSE_SLOTS],
    next: usize,
}

impl CorpseRing {
    pub fn push(&mut self, corpse: Corpse) {
        self.slots[self.next] = Some(corpse);
        self.next = (self.next + 1) % CORPSE_SLOTS;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Corpse> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
struct Bridge {
    switches: Vec<Rect>,
    /// Cells still standing; the next one to fall is last
    pending: Vec<(i32, i32)>,
    triggered: bool,
    timer: f32,
}

/// One level of the duel
pub struct MatchController {
    id: Uuid,
    index: usize,
    boss_level: bool,
    grid: TileGrid,
    rng: ChaCha8Rng,
    combatants: Vec<Combatant>,
    enemies: Vec<Enemy>,
    gems: Vec<Vec2>,
    hazards: Vec<Rect>,
    exits: [Option<Vec2>; 2],
    level_spawns: [Option<Vec2>; 2],
    win_tiles: Vec<Rect>,
    bridge: Bridge,
    corpses: [CorpseRing; 2],
    camera: Camera,
    attacker: usize,
    first_kill: bool,
    phase: MatchPhase,
    loading_time: f32,
    time_remaining: f32,
    score: u32,
    tick: u64,
}

impl MatchController {
    /// Build a level from its text.
    ///
    /// A combatant without a live spawn tile is benched in boss levels and
    /// otherwise starts dead, coming in through the normal respawn path.
    pub fn new(text: &str, setup: MatchSetup) -> Result<Self, LevelError> {
        let rules = SpawnRules {
            attacker: setup.attacker,
            first_kill: setup.first_kill,
            boss_level: setup.boss_level,
        };
        let layout = parse_level(text, rules)?;
        let grid = layout.grid;

        let combatants = (0..2)
            .map(|i| match (layout.spawns[i], setup.boss_level) {
                (None, false) => {
                    let mut late = Combatant::new(i, layout.spawns[setup.attacker]);
                    late.alive = false;
                    late
                }
                (spawn, _) => Combatant::new(i, spawn),
            })
            .zip(setup.records)
            .map(|(mut combatant, record)| {
                combatant.restore_record(record);
                combatant
            })
            .collect::<Vec<_>>();

        let enemies = layout
            .enemies
            .iter()
            .enumerate()
            .map(|(i, spawn)| Enemy::spawn(i, spawn))
            .collect();

        let hazards = layout
            .hazards
            .iter()
            .map(|p| {
                let (w, h) = HAZARD_SIZE;
                Rect::new(p.x.round() as i32 - w / 2, p.y.round() as i32 - h, w, h)
            })
            .collect();

        let bridge = Bridge {
            switches: layout.switches.iter().map(|&(x, y)| grid.bounds_of(x, y)).collect(),
            pending: layout.bridge,
            ..Bridge::default()
        };

        let mut camera = Camera::new(setup.viewport_width);
        let focus = if setup.first_kill {
            combatants[setup.attacker].body.position.x
        } else {
            Camera::opening_focus(&grid)
        };
        camera.center_on(focus, &grid);

        let id = Uuid::new_v4();
        info!(
            match_id = %id,
            level = setup.index,
            attacker = setup.attacker,
            boss_level = setup.boss_level,
            width = grid.width(),
            height = grid.height(),
            "Level loaded"
        );

        Ok(Self {
            id,
            index: setup.index,
            boss_level: setup.boss_level,
            win_tiles: layout.win_tiles.iter().map(|&(x, y)| grid.bounds_of(x, y)).collect(),
            grid,
            rng: ChaCha8Rng::seed_from_u64(setup.seed),
            combatants,
            enemies,
            gems: layout.gems,
            hazards,
            exits: layout.exits,
            level_spawns: layout.spawns,
            bridge,
            corpses: Default::default(),
            camera,
            attacker: setup.attacker,
            first_kill: setup.first_kill,
            phase: MatchPhase::Loading,
            loading_time: LOADING_TIME,
            time_remaining: LEVEL_TIME,
            score: 0,
            tick: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_boss_level(&self) -> bool {
        self.boss_level
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn attacker(&self) -> usize {
        self.attacker
    }

    pub fn first_kill(&self) -> bool {
        self.first_kill
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn combatant(&self, index: usize) -> Option<&Combatant> {
        self.combatants.get(index)
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn gems(&self) -> &[Vec2] {
        &self.gems
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Per-combatant tallies to hand to the next level
    pub fn kill_records(&self) -> [KillRecord; 2] {
        let mut records = [KillRecord::default(); 2];
        for (record, combatant) in records.iter_mut().zip(&self.combatants) {
            *record = combatant.kill_record();
        }
        records
    }

    pub fn corpses(&self, combatant: usize) -> Option<&CorpseRing> {
        self.corpses.get(combatant)
    }

    /// The attacker stood on its exit this level
    pub fn reached_exit(&self) -> bool {
        matches!(self.phase, MatchPhase::ExitReached | MatchPhase::Completed)
    }

    /// Advance the level by one tick
    pub fn step(&mut self, inputs: &[InputCommand; 2], dt: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.tick += 1;

        match self.phase {
            MatchPhase::Loading => {
                if countdown(&mut self.loading_time, dt) {
                    self.phase = MatchPhase::Active;
                    events.push(GameEvent::LevelStarted { index: self.index });
                    debug!(match_id = %self.id, level = self.index, "Level started");
                }
            }
            MatchPhase::Active => self.run_active(inputs, dt, &mut events),
            MatchPhase::ExitReached => self.tally(dt, &mut events),
            MatchPhase::Completed | MatchPhase::Victory | MatchPhase::Defeat => {}
        }

        events
    }

    fn run_active(&mut self, inputs: &[InputCommand; 2], dt: f32, events: &mut Vec<GameEvent>) {
        self.time_remaining -= dt;
        if self.time_remaining < 0.0 {
            self.time_remaining = LEVEL_TIME;
        }

        self.update_bridge(dt, events);

        for i in 0..self.combatants.len() {
            self.update_combatant(i, &inputs[i], dt, events);
            if self.phase != MatchPhase::Active {
                return;
            }
        }

        self.update_enemies(dt, events);
        if self.phase != MatchPhase::Active {
            return;
        }

        self.pull_in_stragglers(events);
        self.update_camera();
    }

    fn update_combatant(&mut self, i: usize, input: &InputCommand, dt: f32, events: &mut Vec<GameEvent>) {
        let combatant = &mut self.combatants[i];
        if !combatant.active {
            return;
        }
        if !combatant.alive {
            combatant.dead_for += dt;
            if !self.boss_level && combatant.dead_for >= RESPAWN_DELAY {
                self.start_new_life(i, events);
            }
            return;
        }

        let (body_input, orders) = combatant.plan(input, dt);
        let blockers: Vec<Rect> = self
            .combatants
            .iter()
            .filter(|other| other.index != i && other.in_play())
            .map(|other| other.bounds())
            .collect();
        self.combatants[i].step_body(body_input, &self.grid, &blockers, dt, events);

        let mut arsenal = std::mem::take(&mut self.combatants[i].arsenal);
        let mut ctx = MatchContext {
            grid: &self.grid,
            rng: &mut self.rng,
            combatants: &mut self.combatants,
            enemies: &mut self.enemies,
            dt,
        };
        let hits = arsenal.update(i, orders, &mut ctx, events);
        self.combatants[i].arsenal = arsenal;
        self.resolve_hits(hits, events);
        if self.phase != MatchPhase::Active || !self.combatants[i].in_play() {
            return;
        }

        self.collect_gems(i, events);
        if self.check_environment(i, events) {
            return;
        }

        if i == self.attacker {
            self.check_switches(i, events);
            if self.boss_level {
                self.check_win_tile(i, events);
            } else {
                self.check_exit(i, events);
            }
        }
    }

    fn update_enemies(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        for e in 0..self.enemies.len() {
            let Some(mut boss) = self.enemies[e].take_bowser() else {
                self.enemies[e].patrol(&self.grid, dt);
                continue;
            };
            let source = HitSource::Enemy(e);

            let mut ctx = MatchContext {
                grid: &self.grid,
                rng: &mut self.rng,
                combatants: &mut self.combatants,
                enemies: &mut self.enemies,
                dt,
            };
            let attack = boss.pursue(self.attacker, &mut ctx);
            let (origin, direction) = boss.aim();
            let breath = boss.breath();
            if attack && breath.fire(origin, direction) {
                events.push(GameEvent::Shot {
                    shooter: source,
                    weapon: WeaponKind::Fire,
                    x: origin.x,
                    y: origin.y,
                });
                events.push(GameEvent::Sound {
                    cue: breath.stats.cue,
                });
            }
            let hits = breath.update(source, origin, direction, &mut ctx, events);

            self.enemies[e].restore_bowser(boss);
            self.resolve_hits(hits, events);
        }
    }

    /// Turn landed hits into events, deaths and attacker changes
    fn resolve_hits(&mut self, hits: Vec<HitEvent>, events: &mut Vec<GameEvent>) {
        for hit in hits {
            events.push(GameEvent::Hit {
                source: hit.source,
                target: hit.target,
                damage: hit.damage,
            });
            events.push(GameEvent::Sound { cue: SoundCue::Hit });

            if !hit.killed {
                continue;
            }
            match hit.target {
                TargetId::Combatant(victim) => {
                    let (killer, cause) = match hit.source {
                        HitSource::Combatant(k) => (Some(k), DeathCause::Weapon),
                        HitSource::Enemy(_) => (None, DeathCause::BossFire),
                        HitSource::Environment => (None, DeathCause::Hazard),
                    };
                    self.on_combatant_killed(victim, killer, cause, events);
                }
                TargetId::Enemy(enemy) => {
                    let boss = self.enemies.get(enemy).is_some_and(|e| e.as_bowser().is_some());
                    if boss {
                        info!(match_id = %self.id, enemy, "Boss killed");
                    } else {
                        debug!(match_id = %self.id, enemy, "Enemy killed");
                    }
                    events.push(GameEvent::EnemyKilled {
                        enemy,
                        source: hit.source,
                    });
                }
            }
        }
    }

    /// Bookkeeping after a combatant has died
    fn on_combatant_killed(
        &mut self,
        victim: usize,
        killer: Option<usize>,
        cause: DeathCause,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(dead) = self.combatants.get(victim) else {
            return;
        };
        self.corpses[victim].push(Corpse {
            position: dead.body.position,
            facing: dead.facing,
        });

        info!(match_id = %self.id, combatant = victim, ?killer, ?cause, "Combatant killed");
        events.push(GameEvent::Kill {
            killer,
            victim,
            cause,
        });
        events.push(GameEvent::Sound {
            cue: SoundCue::Killed,
        });

        if !self.first_kill {
            self.first_kill = true;
            info!(match_id = %self.id, combatant = victim, "First blood");
            events.push(GameEvent::FirstBlood { killer, victim });
            events.push(GameEvent::Sound {
                cue: SoundCue::FirstBlood,
            });
        }

        if let Some(k) = killer.filter(|&k| k != victim) {
            let streak = {
                let winner = &mut self.combatants[k];
                winner.kill_streak += 1;
                winner.total_kills += 1;
                winner.kill_streak
            };
            let roll = if streak >= 4 { self.rng.gen_range(1..200) } else { 0 };
            if let Some(tier) = KillStreakTier::for_streak(streak, roll) {
                events.push(GameEvent::KillStreak { combatant: k, tier });
            }
        }

        if self.boss_level {
            if victim == self.attacker {
                self.phase = MatchPhase::Defeat;
                info!(match_id = %self.id, combatant = victim, "Defeat");
                events.push(GameEvent::Defeat { combatant: victim });
            }
            return;
        }

        let next = killer.unwrap_or(1 - self.attacker);
        if next != self.attacker {
            self.attacker = next;
            info!(match_id = %self.id, attacker = next, "Attacker changed");
            events.push(GameEvent::AttackerChanged { attacker: next });
        }
    }

    /// Revive a combatant ahead of the attacker
    fn start_new_life(&mut self, i: usize, events: &mut Vec<GameEvent>) {
        let death = self.combatants[i].body.position;
        let position = match self.camera.spawn_x(self.attacker, &self.grid) {
            Some(x) => Vec2::new(x, death.y - RESPAWN_LIFT),
            None => self.level_spawns[i]
                .or(self.level_spawns[self.attacker])
                .unwrap_or(death),
        };

        let combatant = &mut self.combatants[i];
        combatant.reset(position);
        combatant.respawn_position = position;
        debug!(match_id = %self.id, combatant = i, x = position.x, y = position.y, "Respawned");
        events.push(GameEvent::Respawned {
            combatant: i,
            x: position.x,
            y: position.y,
        });
    }

    fn collect_gems(&mut self, i: usize, events: &mut Vec<GameEvent>) {
        let bounds = self.combatants[i].bounds();
        let before = self.gems.len();
        self.gems.retain(|&gem| !bounds.intersects_circle(gem, GEM_RADIUS));

        for _ in self.gems.len()..before {
            self.score += GEM_POINTS;
            events.push(GameEvent::GemCollected {
                combatant: i,
                points: GEM_POINTS,
            });
            events.push(GameEvent::Sound {
                cue: SoundCue::GemCollected,
            });
        }
    }

    /// Hazards, enemy contact and falling out of the level. Returns true on death.
    fn check_environment(&mut self, i: usize, events: &mut Vec<GameEvent>) -> bool {
        let bounds = self.combatants[i].bounds();

        if self.hazards.iter().any(|h| h.intersects(&bounds)) {
            // spikes ignore roll invulnerability
            let hit = self.combatants[i].take_hit(HAZARD_DAMAGE, 0.0, HitSource::Environment);
            self.resolve_hits(vec![hit], events);
            if hit.killed {
                return true;
            }
        }

        let touching_enemy = self
            .enemies
            .iter()
            .any(|e| e.is_alive() && e.bounds().intersects(&bounds));
        if touching_enemy {
            self.combatants[i].die();
            self.on_combatant_killed(i, None, DeathCause::EnemyContact, events);
            return true;
        }

        if bounds.top() as f32 >= self.grid.pixel_height() {
            self.combatants[i].die();
            self.on_combatant_killed(i, None, DeathCause::Fall, events);
            return true;
        }

        false
    }

    fn check_switches(&mut self, i: usize, events: &mut Vec<GameEvent>) {
        if self.bridge.triggered {
            return;
        }
        let bounds = self.combatants[i].bounds();
        let Some(switch) = self.bridge.switches.iter().find(|s| s.intersects(&bounds)).copied() else {
            return;
        };

        let (sx, sy) = (switch.x / TILE_WIDTH, switch.y / TILE_HEIGHT);
        // farthest first so the nearest cell pops off the end
        self.bridge.pending.sort_by_key(|&(x, y)| {
            let (dx, dy) = (x - sx, y - sy);
            std::cmp::Reverse(dx * dx + dy * dy)
        });
        self.bridge.triggered = true;
        self.bridge.timer = BRIDGE_STEP;
        info!(match_id = %self.id, combatant = i, tiles = self.bridge.pending.len(), "Bridge triggered");
        events.push(GameEvent::BridgeTriggered);
    }

    fn update_bridge(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        if !self.bridge.triggered || self.bridge.pending.is_empty() {
            return;
        }
        self.bridge.timer -= dt;
        if self.bridge.timer > 0.0 {
            return;
        }
        self.bridge.timer += BRIDGE_STEP;

        if let Some((x, y)) = self.bridge.pending.pop() {
            if self.grid.withdraw(x, y) {
                debug!(match_id = %self.id, x, y, "Bridge tile withdrawn");
                events.push(GameEvent::BridgeWithdrawn { x, y });
            }
        }
    }

    fn check_exit(&mut self, i: usize, events: &mut Vec<GameEvent>) {
        let Some(exit) = self.exits[i] else {
            return;
        };
        let combatant = &mut self.combatants[i];
        if !self.first_kill || !combatant.body.is_on_ground || !combatant.bounds().contains_point(exit) {
            return;
        }

        combatant.celebrating = true;
        self.phase = MatchPhase::ExitReached;
        info!(
            match_id = %self.id,
            combatant = i,
            time_remaining = self.time_remaining,
            "Exit reached"
        );
        events.push(GameEvent::ExitReached { combatant: i });
        events.push(GameEvent::Sound {
            cue: SoundCue::ExitReached,
        });
    }

    fn check_win_tile(&mut self, i: usize, events: &mut Vec<GameEvent>) {
        let bounds = self.combatants[i].bounds();
        if self.win_tiles.iter().any(|w| w.intersects(&bounds)) {
            self.combatants[i].celebrating = true;
            self.phase = MatchPhase::Victory;
            info!(match_id = %self.id, combatant = i, "Victory");
            events.push(GameEvent::Victory { combatant: i });
        }
    }

    /// Move a non-attacker that fell far behind to the spawn ahead of the view
    fn pull_in_stragglers(&mut self, events: &mut Vec<GameEvent>) {
        if !self.first_kill {
            return;
        }
        let other = 1 - self.attacker;
        let Some(straggler) = self.combatants.get(other) else {
            return;
        };
        if !straggler.in_play() || !self.camera.is_straggler(straggler.body.position.x, &self.grid) {
            return;
        }
        let Some(x) = self.camera.spawn_x(self.attacker, &self.grid) else {
            return;
        };

        let position = Vec2::new(x, straggler.body.position.y - RESPAWN_LIFT);
        self.combatants[other].reset(position);
        debug!(match_id = %self.id, combatant = other, x, "Straggler pulled in");
        events.push(GameEvent::Respawned {
            combatant: other,
            x: position.x,
            y: position.y,
        });
    }

    fn update_camera(&mut self) {
        let focus = if self.first_kill {
            self.combatants[self.attacker].body.position.x
        } else {
            Camera::opening_focus(&self.grid)
        };
        self.camera.follow(focus, &self.grid);
    }

    /// Convert the remaining clock into score
    fn tally(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        let available = self.time_remaining.ceil().max(0.0) as u32;
        let seconds = ((dt * 100.0).round() as u32).min(available);
        self.time_remaining -= seconds as f32;
        self.score += POINTS_PER_SECOND * seconds;

        if self.time_remaining <= 0.0 {
            self.time_remaining = 0.0;
            self.phase = MatchPhase::Completed;
            info!(match_id = %self.id, level = self.index, score = self.score, "Level completed");
            events.push(GameEvent::LevelCompleted {
                index: self.index,
                score: self.score,
            });
        }
    }
}
