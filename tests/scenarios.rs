//! Scripted end-to-end scenarios against the public simulation API

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use duel_platformer::game::combat::{Damageable, MatchContext, Weapon};
use duel_platformer::game::combatant::AnimationState;
use duel_platformer::game::enemy::Enemy;
use duel_platformer::game::physics::{BodyKind, BodyStats, PhysicsSystem};
use duel_platformer::game::{
    Combatant, DeathCause, GameEvent, HitSource, InputCommand, KillStreakTier, MatchController, MatchPhase,
    MatchSetup, SnapshotBuilder, TargetId, WeaponKind, WeaponSwitch,
};
use duel_platformer::level::{parse_level, SpawnRules, TileCollision};
use duel_platformer::util::time::tick_delta;
use duel_platformer::util::Vec2;

fn idle() -> [InputCommand; 2] {
    [InputCommand::idle(), InputCommand::idle()]
}

/// Step through the loading pause plus a few ticks so bodies settle
fn start(level: &mut MatchController) {
    while level.phase() == MatchPhase::Loading {
        level.step(&idle(), tick_delta());
    }
    for _ in 0..5 {
        level.step(&idle(), tick_delta());
    }
}

fn run_until<F>(level: &mut MatchController, inputs: [InputCommand; 2], max_ticks: usize, mut done: F) -> Vec<GameEvent>
where
    F: FnMut(&MatchController, &[GameEvent]) -> bool,
{
    let mut all = Vec::new();
    for _ in 0..max_ticks {
        let events = level.step(&inputs, tick_delta());
        let stop = done(level, &events);
        all.extend(events);
        if stop {
            break;
        }
    }
    all
}

#[test]
fn out_of_bounds_walls_are_hard_and_sky_is_open() {
    let layout = parse_level("1..X\n####", SpawnRules::default()).unwrap();
    let grid = &layout.grid;

    for y in -2..4 {
        assert_eq!(grid.classify(-1, y), TileCollision::Impassable);
        assert_eq!(grid.classify(4, y), TileCollision::Impassable);
    }
    for x in 0..4 {
        assert_eq!(grid.classify(x, -1), TileCollision::Passable);
        assert_eq!(grid.classify(x, 2), TileCollision::Passable);
    }
}

#[test]
fn jumping_through_a_platform_lands_on_top() {
    let text = "\
............
..------....
............
....1....XQ2
############";
    let mut level = MatchController::new(text, MatchSetup::default()).unwrap();
    start(&mut level);
    assert_eq!(level.combatants()[0].body.position.y, 128.0);

    let jump = InputCommand {
        jump_held: true,
        ..InputCommand::default()
    };
    for _ in 0..30 {
        level.step(&[jump, InputCommand::idle()], tick_delta());
    }
    for _ in 0..60 {
        level.step(&idle(), tick_delta());
    }

    let body = &level.combatants()[0].body;
    assert_eq!(body.position.y, 32.0);
    assert!(body.is_on_ground);
}

#[test]
fn jump_curve_spans_launch_to_rest() {
    let stats = BodyStats::for_kind(BodyKind::Combatant);
    assert_eq!(PhysicsSystem::jump_curve_velocity(0.0, &stats), -3500.0);
    assert!(PhysicsSystem::jump_curve_velocity(stats.max_jump_time, &stats).abs() < 1e-3);

    let early = PhysicsSystem::jump_curve_velocity(0.05, &stats);
    let late = PhysicsSystem::jump_curve_velocity(0.25, &stats);
    assert!(early < late && late < 0.0);
}

#[test]
fn full_pool_refuses_to_fire() {
    let layout = parse_level("1..X\n####", SpawnRules::default()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut combatants: Vec<Combatant> = Vec::new();
    let mut enemies: Vec<Enemy> = Vec::new();
    let mut events = Vec::new();
    let origin = Vec2::new(20.0, 64.0);

    let mut breath = Weapon::new(WeaponKind::Fire);
    for _ in 0..4 {
        assert!(breath.fire(origin, 1.0));
        let mut ctx = MatchContext {
            grid: &layout.grid,
            rng: &mut rng,
            combatants: &mut combatants,
            enemies: &mut enemies,
            dt: 0.81,
        };
        breath.update(HitSource::Enemy(0), origin, 1.0, &mut ctx, &mut events);
    }

    assert!(breath.is_ready());
    assert_eq!(breath.live_count(), 4);
    assert!(!breath.fire(origin, 1.0));
    assert_eq!(breath.live_count(), 4);
}

#[test]
fn rolling_combatant_cannot_be_hit() {
    let layout = parse_level("1..X\n####", SpawnRules::default()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut enemies: Vec<Enemy> = Vec::new();

    let mut roller = Combatant::new(0, Some(Vec2::new(60.0, 32.0)));
    roller.body.is_on_ground = true;
    assert!(roller.body.try_start_roll());
    let mut combatants = vec![roller];

    let mut ctx = MatchContext {
        grid: &layout.grid,
        rng: &mut rng,
        combatants: &mut combatants,
        enemies: &mut enemies,
        dt: tick_delta(),
    };
    let area = ctx.combatants[0].hit_bounds();
    assert!(ctx.first_target(&area, HitSource::Combatant(1), true).is_none());
    assert!(ctx
        .strike(TargetId::Combatant(0), 50.0, 1.0, HitSource::Combatant(1))
        .is_none());
    assert_eq!(ctx.combatants[0].health, 100.0);
}

/// Fire every 12 ticks, enough to clear the handgun cooldown
fn trigger(tick: usize) -> InputCommand {
    InputCommand {
        fire_pressed: tick % 12 == 0,
        ..InputCommand::default()
    }
}

/// A 40-tile level with spawns for 0 and 1 and exits at the far end
fn wide_level(spawn_1: usize) -> String {
    let mut row = vec!['.'; 40];
    row[0] = '1';
    row[spawn_1] = '2';
    row[38] = 'X';
    row[39] = 'Q';
    let row: String = row.into_iter().collect();
    format!("{}\n{}\n{}", ".".repeat(40), row, "#".repeat(40))
}

fn hits_on(events: &[GameEvent], victim: usize) -> Vec<f32> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::Hit {
                target: TargetId::Combatant(v),
                damage,
                ..
            } if *v == victim => Some(*damage),
            _ => None,
        })
        .collect()
}

#[test]
fn knife_lands_once_per_swing() {
    let text = "\
............
.12.....XQ..
############";
    let mut level = MatchController::new(text, MatchSetup::default()).unwrap();
    start(&mut level);

    let stab = InputCommand {
        weapon_switch: Some(WeaponSwitch::Select(WeaponKind::Knife)),
        fire_pressed: true,
        ..InputCommand::default()
    };
    let mut events = level.step(&[stab, InputCommand::idle()], tick_delta());
    assert_eq!(level.combatants()[0].animation(), AnimationState::Attacking);

    for _ in 0..60 {
        events.extend(level.step(&idle(), tick_delta()));
    }

    assert_eq!(hits_on(&events, 1), vec![30.0]);
    assert_eq!(level.combatants()[1].health, 70.0);
    assert_ne!(level.combatants()[0].animation(), AnimationState::Attacking);
}

#[test]
fn grenade_blast_hits_each_target_once() {
    let layout = parse_level("1.2.XQ\n######", SpawnRules::default()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut enemies: Vec<Enemy> = Vec::new();
    let origin = Vec2::new(60.0, 32.0);

    let mut tough = Combatant::new(1, Some(Vec2::new(100.0, 32.0)));
    tough.health = 1000.0;
    let mut combatants = vec![Combatant::new(0, Some(origin)), tough];

    let mut grenade = Weapon::new(WeaponKind::Grenade);
    assert!(grenade.fire(origin, 1.0));

    let mut events = Vec::new();
    let mut hits = Vec::new();
    for _ in 0..60 {
        let mut ctx = MatchContext {
            grid: &layout.grid,
            rng: &mut rng,
            combatants: &mut combatants,
            enemies: &mut enemies,
            dt: tick_delta(),
        };
        hits.extend(grenade.update(HitSource::Combatant(0), origin, 1.0, &mut ctx, &mut events));
    }

    let bursts = events
        .iter()
        .filter(|e| matches!(e, GameEvent::GrenadeExploded { .. }))
        .count();
    assert_eq!(bursts, 1);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].target, TargetId::Combatant(1));
    assert_eq!(hits[0].damage, 100.0);
    assert_eq!(combatants[1].health, 900.0);
    assert_eq!(combatants[0].health, 100.0);
    assert!(grenade.explosion().is_none());
}

#[test]
fn falling_out_of_the_level_flips_the_attacker() {
    let text = "\
............
1.......XQ.2
##..########";
    let mut level = MatchController::new(
        text,
        MatchSetup {
            attacker: 1,
            ..MatchSetup::default()
        },
    )
    .unwrap();
    start(&mut level);

    let events = run_until(&mut level, [InputCommand::run(1.0), InputCommand::idle()], 240, |_, ev| {
        ev.iter().any(|e| matches!(e, GameEvent::Kill { .. }))
    });

    assert!(events.contains(&GameEvent::Kill {
        killer: None,
        victim: 0,
        cause: DeathCause::Fall,
    }));
    assert!(events.contains(&GameEvent::AttackerChanged { attacker: 0 }));
    assert_eq!(level.attacker(), 0);
}

#[test]
fn boss_fire_on_the_attacker_is_a_defeat() {
    let text = "\
..............
1.........E..W
##############";
    let mut level = MatchController::new(
        text,
        MatchSetup {
            boss_level: true,
            ..MatchSetup::default()
        },
    )
    .unwrap();

    let events = run_until(&mut level, idle(), 3_600, |l, _| l.phase().is_finished());

    assert_eq!(level.phase(), MatchPhase::Defeat);
    assert_eq!(hits_on(&events, 0), vec![35.0, 35.0, 35.0]);
    assert!(events.contains(&GameEvent::Kill {
        killer: None,
        victim: 0,
        cause: DeathCause::BossFire,
    }));
    assert!(events.contains(&GameEvent::Defeat { combatant: 0 }));
    assert_eq!(level.attacker(), 0);
}

#[test]
fn victim_respawns_past_the_view_and_above_its_death() {
    let mut level = MatchController::new(
        &wide_level(3),
        MatchSetup {
            first_kill: true,
            ..MatchSetup::default()
        },
    )
    .unwrap();
    start(&mut level);
    assert_eq!(level.camera().position, 0.0);

    let mut events = Vec::new();
    for tick in 0..600 {
        events.extend(level.step(&[trigger(tick), InputCommand::idle()], tick_delta()));
        if events.iter().any(|e| matches!(e, GameEvent::Respawned { .. })) {
            break;
        }
    }

    assert!(events.contains(&GameEvent::Kill {
        killer: Some(0),
        victim: 1,
        cause: DeathCause::Weapon,
    }));
    // right edge of the view plus one tile, 100 px above the 64 px floor
    assert!(events.contains(&GameEvent::Respawned {
        combatant: 1,
        x: 840.0,
        y: -36.0,
    }));
    assert!(level.combatants()[1].alive);
    assert_eq!(level.corpses(1).map(|r| r.len()), Some(1));
}

#[test]
fn straggler_is_pulled_in_ahead_of_the_attacker() {
    let mut level = MatchController::new(
        &wide_level(30),
        MatchSetup {
            first_kill: true,
            ..MatchSetup::default()
        },
    )
    .unwrap();
    assert_eq!(level.combatants()[1].body.position.x, 1220.0);

    let events = run_until(&mut level, idle(), 240, |_, ev| {
        ev.iter().any(|e| matches!(e, GameEvent::Respawned { .. }))
    });

    assert!(events.contains(&GameEvent::Respawned {
        combatant: 1,
        x: 840.0,
        y: -36.0,
    }));
    assert!(!events.iter().any(|e| matches!(e, GameEvent::Kill { .. })));
    assert!(level.combatants()[1].alive);
    assert_eq!(level.corpses(1).map(|r| r.len()), Some(0));
}

#[test]
fn repeated_kills_climb_the_streak_tiers() {
    let text = "\
............
1..2.....XQ.
############";
    let mut level = MatchController::new(text, MatchSetup::default()).unwrap();
    start(&mut level);

    let mut tiers = Vec::new();
    for tick in 0..1_200 {
        for e in level.step(&[trigger(tick), InputCommand::idle()], tick_delta()) {
            if let GameEvent::KillStreak { combatant: 0, tier } = e {
                tiers.push(tier);
            }
        }
        if tiers.len() == 2 {
            break;
        }
    }

    assert_eq!(tiers, vec![KillStreakTier::Double, KillStreakTier::Multi]);
    let shooter = &level.combatants()[0];
    assert_eq!(shooter.kill_streak, 3);
    assert_eq!(shooter.total_kills, 3);
    assert_eq!(level.attacker(), 0);
}

#[test]
fn hazard_death_hands_the_attack_to_the_victim() {
    let text = "\
............
1^......XQ.2
############";
    let mut level = MatchController::new(
        text,
        MatchSetup {
            attacker: 1,
            ..MatchSetup::default()
        },
    )
    .unwrap();
    start(&mut level);
    assert_eq!(level.attacker(), 1);

    let events = run_until(&mut level, [InputCommand::run(1.0), InputCommand::idle()], 120, |_, ev| {
        ev.iter().any(|e| matches!(e, GameEvent::Kill { .. }))
    });

    assert!(events.contains(&GameEvent::Kill {
        killer: None,
        victim: 0,
        cause: DeathCause::Hazard,
    }));
    assert!(!level.combatants()[0].alive);
    assert_eq!(level.attacker(), 0);
    assert!(level.first_kill());
}

const EXIT_LEVEL: &str = "\
............
..1X#....Q.2
############";

#[test]
fn attacker_on_its_exit_reaches_it_the_same_tick() {
    let mut level = MatchController::new(
        EXIT_LEVEL,
        MatchSetup {
            first_kill: true,
            ..MatchSetup::default()
        },
    )
    .unwrap();
    start(&mut level);
    let exit = Vec2::new(140.0, 48.0);

    for _ in 0..120 {
        let events = level.step(&[InputCommand::run(1.0), InputCommand::idle()], tick_delta());
        let c = &level.combatants()[0];
        let standing_on_exit = c.body.is_on_ground && c.bounds().contains_point(exit);
        if level.phase() == MatchPhase::Active {
            assert!(!standing_on_exit);
        } else {
            assert!(standing_on_exit);
            assert!(events.contains(&GameEvent::ExitReached { combatant: 0 }));
            break;
        }
    }
    assert_eq!(level.phase(), MatchPhase::ExitReached);
    assert!(level.reached_exit());
    assert!(level.combatants()[0].celebrating);
}

#[test]
fn non_attacker_on_an_exit_does_nothing() {
    let mut level = MatchController::new(
        EXIT_LEVEL,
        MatchSetup {
            attacker: 1,
            first_kill: true,
            ..MatchSetup::default()
        },
    )
    .unwrap();
    start(&mut level);

    for _ in 0..120 {
        level.step(&[InputCommand::run(1.0), InputCommand::idle()], tick_delta());
    }
    let c = &level.combatants()[0];
    assert!(c.bounds().contains_point(Vec2::new(140.0, 48.0)));
    assert_eq!(level.phase(), MatchPhase::Active);
}

#[test]
fn exit_needs_first_blood() {
    let mut level = MatchController::new(EXIT_LEVEL, MatchSetup::default()).unwrap();
    start(&mut level);
    for _ in 0..120 {
        level.step(&[InputCommand::run(1.0), InputCommand::idle()], tick_delta());
    }
    assert_eq!(level.phase(), MatchPhase::Active);
}

#[test]
fn running_into_a_gem_scores_it() {
    let text = "\
..........
1..G..X..#
##########";
    let mut level = MatchController::new(text, MatchSetup::default()).unwrap();
    start(&mut level);
    assert_eq!(level.gems().len(), 1);

    let events = run_until(&mut level, [InputCommand::run(1.0), InputCommand::idle()], 120, |l, _| {
        l.gems().is_empty()
    });

    assert_eq!(level.score(), 30);
    assert!(level.gems().is_empty());
    assert!(events.contains(&GameEvent::GemCollected {
        combatant: 0,
        points: 30
    }));
}

#[test]
fn shooting_the_attacker_takes_over_the_attack() {
    let text = "\
............
.1..2...XQ..
############";
    let mut level = MatchController::new(
        text,
        MatchSetup {
            attacker: 1,
            ..MatchSetup::default()
        },
    )
    .unwrap();
    start(&mut level);

    let mut events = Vec::new();
    for tick in 0..120 {
        let shooter = InputCommand {
            fire_pressed: tick % 12 == 0,
            ..InputCommand::default()
        };
        events.extend(level.step(&[shooter, InputCommand::idle()], tick_delta()));
        if events.iter().any(|e| matches!(e, GameEvent::Kill { .. })) {
            break;
        }
    }

    let hits = events
        .iter()
        .filter(|e| matches!(e, GameEvent::Hit { target: TargetId::Combatant(1), .. }))
        .count();
    assert_eq!(hits, 4);
    assert!(events.contains(&GameEvent::FirstBlood {
        killer: Some(0),
        victim: 1,
    }));
    assert!(events.contains(&GameEvent::AttackerChanged { attacker: 0 }));
    assert_eq!(level.attacker(), 0);
    assert_eq!(level.combatants()[0].total_kills, 1);
}

#[test]
fn boss_level_benches_the_defender_and_ends_on_the_win_tile() {
    let text = "\
..........
2.1....W..
##########";
    let mut level = MatchController::new(
        text,
        MatchSetup {
            boss_level: true,
            ..MatchSetup::default()
        },
    )
    .unwrap();
    assert!(!level.combatants()[1].active);
    start(&mut level);

    let events = run_until(&mut level, [InputCommand::run(1.0), InputCommand::idle()], 240, |l, _| {
        l.phase() != MatchPhase::Active
    });
    assert_eq!(level.phase(), MatchPhase::Victory);
    assert!(events.contains(&GameEvent::Victory { combatant: 0 }));
}

#[test]
fn same_seed_same_inputs_same_match() {
    let text = "\
................
1......E.....XQ2
################";

    let script = |tick: usize| -> [InputCommand; 2] {
        let a = InputCommand {
            axis: if (tick / 40) % 2 == 0 { 1.0 } else { -0.5 },
            fire_pressed: tick % 15 == 0,
            jump_held: tick % 50 < 10,
            ..InputCommand::default()
        };
        let b = InputCommand {
            axis: -1.0,
            roll_pressed: tick % 90 == 0,
            grenade_held: tick % 120 < 30,
            ..InputCommand::default()
        };
        [a, b]
    };

    let play = || {
        let setup = MatchSetup {
            seed: 99,
            ..MatchSetup::default()
        };
        let mut level = MatchController::new(text, setup).unwrap();
        let events: Vec<GameEvent> = (0..400)
            .flat_map(|tick| level.step(&script(tick), tick_delta()))
            .collect();
        let mut snapshot = SnapshotBuilder::new(1).build(&level);
        snapshot.match_id = uuid::Uuid::nil();
        (events, snapshot)
    };

    let (events_a, snap_a) = play();
    let (events_b, snap_b) = play();
    assert!(!events_a.is_empty());
    assert_eq!(events_a, events_b);
    assert_eq!(snap_a, snap_b);
}
