use arcade_shooter::compute::*;
use arcade_shooter::config::{GameConfig, ShooterPolicy};
use arcade_shooter::entities::*;
use arcade_shooter::extensions::{self, Extension};

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default tuning with enemy fire switched off, so scenarios only change
/// when the test says so.
fn quiet_config() -> GameConfig {
    GameConfig {
        enemy_fire_chance: 0.0,
        enemy_fire_chance_per_level: 0.0,
        ..GameConfig::default()
    }
}

fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

fn idle() -> InputCommand {
    InputCommand::default()
}

fn enemy(x: f32, y: f32, tier: EnemyTier) -> Enemy {
    Enemy {
        bounds: Rect::new(x, y, 25.0, 20.0),
        tier,
        column: 0,
    }
}

/// A level holding a single enemy parked out of the way.
fn lone_enemy_state(config: &GameConfig) -> SimulationState {
    let mut state = init_state(config, 1, 0, 3);
    state.enemies = vec![enemy(600.0, 40.0, EnemyTier::Large)];
    state
}

fn player_shot(x: f32, y: f32) -> Projectile {
    Projectile::new(Rect::new(x, y, 4.0, 10.0), -8.0, Owner::Player)
}

fn enemy_shot(x: f32, y: f32) -> Projectile {
    Projectile::new(Rect::new(x, y, 4.0, 8.0), 3.0, Owner::Enemy)
}

// ── init_state ────────────────────────────────────────────────────────────────

#[test]
fn init_state_centres_player_near_bottom() {
    let s = init_state(&GameConfig::default(), 1, 0, 3);
    assert_eq!(s.player.bounds, Rect::new(385.0, 560.0, 30.0, 20.0));
    assert_eq!(s.lives, 3);
    assert_eq!(s.score, 0);
    assert_eq!(s.frame, 0);
    assert_eq!(s.status, StepStatus::Running);
    assert!(s.player_shots.is_empty());
    assert!(s.enemy_shots.is_empty());
}

#[test]
fn init_state_carries_score_and_lives() {
    let s = init_state(&GameConfig::default(), 3, 1200, 2);
    assert_eq!(s.level, 3);
    assert_eq!(s.score, 1200);
    assert_eq!(s.lives, 2);
    assert_eq!(s.formation.speed, 2.0);
}

#[test]
fn init_state_level_zero_is_level_one() {
    let s = init_state(&GameConfig::default(), 0, 0, 3);
    assert_eq!(s.level, 1);
}

#[test]
fn spawn_formation_grid_and_points() {
    let enemies = spawn_formation(&GameConfig::default());
    assert_eq!(enemies.len(), 32);
    assert_eq!(enemies[0].bounds, Rect::new(80.0, 40.0, 25.0, 20.0));
    assert_eq!(enemies[1].bounds.x, 113.0);
    assert_eq!(enemies[8].bounds.y, 68.0);

    let points: Vec<u32> = enemies.iter().step_by(8).map(|e| e.tier.points()).collect();
    assert_eq!(points, vec![30, 20, 20, 10]);
}

// ── Player movement ───────────────────────────────────────────────────────────

#[test]
fn move_left_and_right() {
    let config = quiet_config();
    let s = lone_enemy_state(&config);
    let left = tick(&s, &InputCommand { move_left: true, ..idle() }, &config, &mut seeded_rng());
    assert_eq!(left.player.bounds.x, 380.0);
    let right = tick(&s, &InputCommand { move_right: true, ..idle() }, &config, &mut seeded_rng());
    assert_eq!(right.player.bounds.x, 390.0);
}

#[test]
fn opposite_directions_cancel() {
    let config = quiet_config();
    let s = lone_enemy_state(&config);
    let both = InputCommand {
        move_left: true,
        move_right: true,
        ..idle()
    };
    let next = tick(&s, &both, &config, &mut seeded_rng());
    assert_eq!(next.player.bounds.x, 385.0);
}

#[test]
fn movement_clamps_at_edges() {
    let config = quiet_config();
    let mut s = lone_enemy_state(&config);
    s.player.bounds.x = 2.0;
    let next = tick(&s, &InputCommand { move_left: true, ..idle() }, &config, &mut seeded_rng());
    assert_eq!(next.player.bounds.x, 0.0);

    s.player.bounds.x = 768.0;
    let next = tick(&s, &InputCommand { move_right: true, ..idle() }, &config, &mut seeded_rng());
    assert_eq!(next.player.bounds.x, 770.0);
}

#[test]
fn drag_centres_player_and_overrides_keys() {
    let config = quiet_config();
    let s = lone_enemy_state(&config);
    let drag = InputCommand {
        move_left: true,
        drag_x: Some(100.0),
        ..idle()
    };
    let next = tick(&s, &drag, &config, &mut seeded_rng());
    assert_eq!(next.player.bounds.x, 85.0);

    let far = InputCommand {
        drag_x: Some(5000.0),
        ..idle()
    };
    let next = tick(&s, &far, &config, &mut seeded_rng());
    assert_eq!(next.player.bounds.x, 770.0);
}

// ── Firing ────────────────────────────────────────────────────────────────────

#[test]
fn fire_spawns_shot_above_player() {
    let config = quiet_config();
    let s = lone_enemy_state(&config);
    let next = tick(&s, &InputCommand { fire: true, ..idle() }, &config, &mut seeded_rng());
    assert_eq!(next.player_shots.len(), 1);
    let shot = &next.player_shots[0];
    assert_eq!(shot.owner, Owner::Player);
    // Spawned at y=550 and advanced once in the same frame.
    assert_eq!(shot.bounds, Rect::new(398.0, 542.0, 4.0, 10.0));
}

#[test]
fn fire_cooldown_is_strict() {
    // 20 ms frames keep the clock exact.
    let config = GameConfig {
        frame_ms: 20.0,
        fire_cooldown_ms: 200.0,
        ..quiet_config()
    };
    let fire = InputCommand { fire: true, ..idle() };
    let mut rng = seeded_rng();
    let mut s = lone_enemy_state(&config);

    for _ in 0..11 {
        step(&mut s, &fire, &config, &mut rng);
    }
    // Frame 11 is exactly one cooldown after frame 1.
    assert_eq!(s.player_shots.len(), 1);

    step(&mut s, &fire, &config, &mut rng);
    assert_eq!(s.player_shots.len(), 2);
}

// ── Projectiles ───────────────────────────────────────────────────────────────

#[test]
fn player_shot_removed_once_fully_above_top() {
    let config = quiet_config();
    let mut rng = seeded_rng();
    let mut s = lone_enemy_state(&config);
    s.player_shots.push(player_shot(10.0, 4.0));

    step(&mut s, &idle(), &config, &mut rng);
    assert_eq!(s.player_shots.len(), 1, "bottom edge still inside");
    step(&mut s, &idle(), &config, &mut rng);
    assert!(s.player_shots.is_empty());
}

#[test]
fn enemy_shot_removed_past_bottom() {
    let config = quiet_config();
    let mut rng = seeded_rng();
    let mut s = lone_enemy_state(&config);
    s.enemy_shots.push(enemy_shot(10.0, 595.0));

    step(&mut s, &idle(), &config, &mut rng);
    assert_eq!(s.enemy_shots.len(), 1);
    step(&mut s, &idle(), &config, &mut rng);
    assert!(s.enemy_shots.is_empty());
}

#[test]
fn player_shot_leaves_within_field_crossing_time() {
    let config = quiet_config();
    let mut rng = seeded_rng();
    let mut s = lone_enemy_state(&config);
    step(&mut s, &InputCommand { fire: true, ..idle() }, &config, &mut rng);
    assert_eq!(s.player_shots.len(), 1);

    let bound = (config.height / config.player_shot_speed()).ceil() as u32;
    let mut frames = 1;
    while !s.player_shots.is_empty() {
        step(&mut s, &idle(), &config, &mut rng);
        frames += 1;
        assert!(frames <= bound, "shot still alive after {frames} frames");
    }
}

#[test]
fn enemy_shot_leaves_within_field_crossing_time() {
    let firing = GameConfig {
        enemy_fire_chance: 1.0,
        enemy_fire_chance_max: 1.0,
        ..GameConfig::default()
    };
    let config = quiet_config();
    let mut rng = seeded_rng();
    let mut s = lone_enemy_state(&config);
    step(&mut s, &idle(), &firing, &mut rng);
    assert_eq!(s.enemy_shots.len(), 1);

    let bound = (config.height / config.enemy_shot_speed_for(1)).ceil() as u32;
    let mut frames = 1;
    while !s.enemy_shots.is_empty() {
        step(&mut s, &idle(), &config, &mut rng);
        frames += 1;
        assert!(frames <= bound, "shot still alive after {frames} frames");
    }
    assert_eq!(s.lives, 3);
}

// ── Formation ─────────────────────────────────────────────────────────────────

#[test]
fn formation_moves_by_speed() {
    let config = quiet_config();
    let s = lone_enemy_state(&config);
    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.enemies[0].bounds.x, 601.0);
    assert_eq!(next.enemies[0].bounds.y, 40.0);
}

#[test]
fn formation_reverses_and_drops_at_right_edge() {
    let config = quiet_config();
    let mut rng = seeded_rng();
    let mut s = init_state(&config, 1, 0, 3);
    s.enemies = vec![enemy(775.0, 40.0, EnemyTier::Large), enemy(500.0, 40.0, EnemyTier::Large)];

    step(&mut s, &idle(), &config, &mut rng);
    assert_eq!(s.formation.heading, Heading::Left);
    // The whole formation drops together and holds its x for the frame.
    assert_eq!(s.enemies[0].bounds, Rect::new(775.0, 55.0, 25.0, 20.0));
    assert_eq!(s.enemies[1].bounds, Rect::new(500.0, 55.0, 25.0, 20.0));

    step(&mut s, &idle(), &config, &mut rng);
    assert_eq!(s.enemies[0].bounds.x, 774.0);
    assert_eq!(s.enemies[1].bounds.x, 499.0);
}

#[test]
fn formation_reverses_at_left_edge() {
    let config = quiet_config();
    let mut s = lone_enemy_state(&config);
    s.enemies[0].bounds.x = 0.5;
    s.formation.heading = Heading::Left;

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.formation.heading, Heading::Right);
    assert_eq!(next.enemies[0].bounds.x, 0.5);
    assert_eq!(next.enemies[0].bounds.y, 55.0);
}

#[test]
fn formation_touching_edge_is_not_reversed() {
    let config = quiet_config();
    let mut s = lone_enemy_state(&config);
    s.enemies[0].bounds.x = 774.0;
    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.formation.heading, Heading::Right);
    assert_eq!(next.enemies[0].bounds.right(), 800.0);
}

// ── Enemy fire ────────────────────────────────────────────────────────────────

#[test]
fn enemy_fire_spawns_below_shooter() {
    let config = GameConfig {
        enemy_fire_chance: 1.0,
        enemy_fire_chance_max: 1.0,
        ..GameConfig::default()
    };
    let s = lone_enemy_state(&config);
    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.enemy_shots.len(), 1);
    let shot = &next.enemy_shots[0];
    assert_eq!(shot.owner, Owner::Enemy);
    assert_eq!(shot.vy, 3.0);
    assert_eq!(shot.bounds, Rect::new(611.5, 60.0, 4.0, 8.0));
}

#[test]
fn enemy_shots_speed_up_with_level() {
    let config = GameConfig {
        enemy_fire_chance: 1.0,
        enemy_fire_chance_max: 1.0,
        ..GameConfig::default()
    };
    let mut s = init_state(&config, 3, 0, 3);
    s.enemies = vec![enemy(600.0, 40.0, EnemyTier::Large)];
    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.enemy_shots[0].vy, 4.0);
}

#[test]
fn front_row_policy_only_fires_from_lowest_row() {
    let config = GameConfig {
        enemy_fire_chance: 1.0,
        enemy_fire_chance_max: 1.0,
        shooter_policy: ShooterPolicy::FrontRow,
        ..GameConfig::default()
    };
    let s = init_state(&config, 1, 0, 3);
    let lowest_bottom = 40.0 + 3.0 * 28.0 + 20.0;
    for seed in 0..20 {
        let next = tick(&s, &idle(), &config, &mut StdRng::seed_from_u64(seed));
        assert_eq!(next.enemy_shots[0].bounds.y, lowest_bottom);
    }
}

// ── Collisions ────────────────────────────────────────────────────────────────

#[test]
fn player_shot_destroys_enemy_and_scores() {
    let config = quiet_config();
    let mut s = init_state(&config, 1, 0, 3);
    s.enemies = vec![enemy(400.0, 300.0, EnemyTier::Small), enemy(100.0, 40.0, EnemyTier::Large)];
    s.player_shots.push(player_shot(405.0, 312.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.score, 30);
    assert_eq!(next.enemies.len(), 1);
    assert_eq!(next.enemies[0].tier, EnemyTier::Large);
    assert!(next.player_shots.is_empty());
    assert_eq!(next.status, StepStatus::Running);
}

#[test]
fn one_shot_destroys_at_most_one_enemy() {
    let config = quiet_config();
    let mut s = init_state(&config, 1, 0, 3);
    // Two overlapping enemies under one shot.
    s.enemies = vec![enemy(400.0, 300.0, EnemyTier::Large), enemy(402.0, 302.0, EnemyTier::Medium)];
    s.player_shots.push(player_shot(410.0, 312.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.score, 10);
    assert_eq!(next.enemies.len(), 1);
    assert_eq!(next.enemies[0].tier, EnemyTier::Medium);
}

#[test]
fn clearing_formation_completes_level() {
    let config = quiet_config();
    let mut s = init_state(&config, 1, 0, 3);
    s.enemies = vec![enemy(400.0, 300.0, EnemyTier::Medium)];
    s.player_shots.push(player_shot(405.0, 312.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.score, 20);
    assert_eq!(next.status, StepStatus::LevelComplete);
}

#[test]
fn enemy_shot_costs_a_life() {
    let config = quiet_config();
    let mut s = lone_enemy_state(&config);
    s.enemy_shots.push(enemy_shot(395.0, 550.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.lives, 2);
    assert!(next.enemy_shots.is_empty());
    assert_eq!(next.status, StepStatus::Running);
}

#[test]
fn last_life_lost_is_game_over() {
    let config = quiet_config();
    let mut s = init_state(&config, 1, 0, 1);
    s.enemies = vec![enemy(600.0, 40.0, EnemyTier::Large)];
    s.enemy_shots.push(enemy_shot(395.0, 550.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.lives, 0);
    assert_eq!(next.status, StepStatus::GameOver(GameOverCause::LivesExhausted));
}

#[test]
fn game_over_beats_level_complete_in_same_frame() {
    let config = quiet_config();
    let mut s = init_state(&config, 1, 0, 1);
    s.enemies = vec![enemy(400.0, 300.0, EnemyTier::Large)];
    s.player_shots.push(player_shot(405.0, 312.0));
    s.enemy_shots.push(enemy_shot(395.0, 550.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert!(next.enemies.is_empty());
    assert_eq!(next.status, StepStatus::GameOver(GameOverCause::LivesExhausted));
}

#[test]
fn formation_reaching_player_line_is_game_over() {
    let config = quiet_config();
    let mut s = lone_enemy_state(&config);
    s.enemies[0].bounds.y = 545.0;
    s.player_shots.push(player_shot(100.0, 300.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.status, StepStatus::GameOver(GameOverCause::Invaded));
    assert_eq!(next.lives, 3);
}

#[test]
fn shield_absorbs_hit() {
    let mut config = quiet_config();
    config.extensions.shield_charges = 1;
    let mut s = lone_enemy_state(&config);
    s.enemy_shots.push(enemy_shot(395.0, 550.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.lives, 3);
    assert_eq!(extensions::shield_charges(&next.extensions), 0);
    assert_eq!(next.extensions, vec![Extension::Shield { charges: 0 }]);
}

// ── Purity and terminal states ────────────────────────────────────────────────

#[test]
fn tick_leaves_input_state_untouched() {
    let config = quiet_config();
    let s = init_state(&config, 1, 0, 3);
    let before = s.clone();
    let next = tick(&s, &InputCommand { fire: true, ..idle() }, &config, &mut seeded_rng());
    assert_eq!(s, before);
    assert_eq!(next.frame, 1);
}

#[test]
fn terminal_state_is_not_stepped() {
    let config = GameConfig::default();
    let mut s = init_state(&config, 1, 0, 3);
    s.status = StepStatus::GameOver(GameOverCause::Invaded);
    let next = tick(&s, &InputCommand { fire: true, ..idle() }, &config, &mut seeded_rng());
    assert_eq!(next, s);
}

#[test]
fn same_seed_same_run() {
    let config = GameConfig::default();
    let run = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut s = init_state(&config, 1, 0, 3);
        for frame in 0..300u32 {
            let input = InputCommand {
                move_left: frame % 40 < 20,
                move_right: frame % 40 >= 20,
                fire: true,
                drag_x: None,
            };
            step(&mut s, &input, &config, &mut rng);
        }
        s
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn invariants_hold_over_random_play() {
    let config = GameConfig {
        enemy_fire_chance: 0.1,
        ..GameConfig::default()
    };
    let mut rng = seeded_rng();
    let mut input_rng = StdRng::seed_from_u64(99);
    let mut s = init_state(&config, 1, 0, 3);

    for _ in 0..2000 {
        let prev_score = s.score;
        let prev_lives = s.lives;
        let input = InputCommand {
            move_left: input_rng.gen_bool(0.5),
            move_right: input_rng.gen_bool(0.5),
            fire: input_rng.gen_bool(0.7),
            drag_x: None,
        };
        step(&mut s, &input, &config, &mut rng);

        assert!(s.score >= prev_score);
        assert!(s.lives <= prev_lives);
        let p = &s.player.bounds;
        assert!(p.x >= 0.0 && p.right() <= s.width);
        for e in &s.enemies {
            assert!(e.bounds.x >= 0.0 && e.bounds.right() <= s.width);
        }
        for shot in &s.player_shots {
            assert!(shot.bounds.bottom() > 0.0);
        }
        for shot in &s.enemy_shots {
            assert!(shot.bounds.y < s.height);
        }
        if s.status.is_terminal() {
            break;
        }
    }
}

// ── Reference scenarios ───────────────────────────────────────────────────────

#[test]
fn scenario_basic_kill() {
    let config = quiet_config();
    let mut s = init_state(&config, 1, 0, 3);
    s.enemies = vec![enemy(100.0, 100.0, EnemyTier::Large)];
    s.player_shots.push(player_shot(110.0, 115.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.score, 10);
    assert!(next.enemies.is_empty());
    assert_eq!(next.status, StepStatus::LevelComplete);
}

#[test]
fn scenario_life_loss() {
    let config = quiet_config();
    let mut s = lone_enemy_state(&config);
    s.player.bounds = Rect::new(100.0, 580.0, 30.0, 20.0);
    s.enemy_shots.push(enemy_shot(110.0, 575.0));

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.lives, 2);
    assert!(next.enemy_shots.is_empty());
    assert_eq!(next.status, StepStatus::Running);
}

#[test]
fn scenario_invasion() {
    let config = quiet_config();
    let mut s = lone_enemy_state(&config);
    s.player.bounds.y = 595.0;
    s.enemies[0].bounds.y = 590.0;

    let next = tick(&s, &idle(), &config, &mut seeded_rng());
    assert_eq!(next.status, StepStatus::GameOver(GameOverCause::Invaded));
    assert_eq!(next.lives, 3);
}
