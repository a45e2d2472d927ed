/// Simulation step.
///
/// [`tick`] takes an immutable reference to the current [`SimulationState`]
/// and returns the next one; [`step`] does the same work in place for callers
/// that own the state.  Side effects are limited to the injected RNG, so a
/// seeded RNG makes every frame reproducible.
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{probability, GameConfig, ShooterPolicy};
use crate::entities::{
    Enemy, EnemyTier, Formation, GameOverCause, Heading, Owner, Player, Projectile, Rect,
    SimulationState, StepStatus,
};
use crate::extensions::{self, FirePattern};

/// Horizontal drift of the outer spread-shot projectiles, per frame.
const SPREAD_DRIFT: f32 = 1.5;

/// One frame of player intent, as produced by the input sampler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputCommand {
    pub move_left: bool,
    pub move_right: bool,
    pub fire: bool,
    /// Target centre x while a drag gesture is active.  Overrides discrete
    /// movement for the frame.
    pub drag_x: Option<f32>,
}

// ── Constructors ──────────────────────────────────────────────────────────────

/// Lay out a fresh formation in rows and columns.
pub fn spawn_formation(config: &GameConfig) -> Vec<Enemy> {
    let mut enemies = Vec::with_capacity(config.formation_rows * config.formation_cols);
    for row in 0..config.formation_rows {
        let tier = EnemyTier::for_row(row);
        for col in 0..config.formation_cols {
            enemies.push(Enemy {
                bounds: Rect::new(
                    config.formation_origin_x + col as f32 * (config.enemy_width + config.enemy_spacing),
                    config.formation_origin_y + row as f32 * (config.enemy_height + config.enemy_spacing),
                    config.enemy_width,
                    config.enemy_height,
                ),
                tier,
                column: col,
            });
        }
    }
    enemies
}

/// Build the state for a level.  Score and lives carry over from the previous
/// level; everything else starts fresh.
pub fn init_state(config: &GameConfig, level: u32, score: u32, lives: u32) -> SimulationState {
    let level = level.max(1);
    SimulationState {
        width: config.width,
        height: config.height,
        player: Player {
            bounds: Rect::new(
                (config.width - config.player_width) / 2.0,
                config.player_y(),
                config.player_width,
                config.player_height,
            ),
            speed: config.player_speed.max(0.0),
        },
        player_shots: Vec::new(),
        enemy_shots: Vec::new(),
        enemies: spawn_formation(config),
        formation: Formation {
            heading: Heading::Right,
            speed: config.formation_speed_for(level),
            drop_distance: config.drop_distance.max(0.0),
        },
        score,
        lives,
        level,
        clock_ms: 0.0,
        last_shot_ms: None,
        frame: 0,
        status: StepStatus::Running,
        extensions: extensions::from_config(&config.extensions),
    }
}

// ── Per-frame step ────────────────────────────────────────────────────────────

/// Advance the simulation by one frame and return the new state.
pub fn tick(
    state: &SimulationState,
    input: &InputCommand,
    config: &GameConfig,
    rng: &mut impl Rng,
) -> SimulationState {
    let mut next = state.clone();
    step(&mut next, input, config, rng);
    next
}

/// Advance `state` by one frame in place.  A state that already reached a
/// terminal status is left untouched.
///
/// Sub-steps run in a fixed order: movement, firing, projectile advance,
/// formation advance, invasion check, enemy fire, shot-vs-enemy collisions,
/// shot-vs-player collisions, win check.  Lives running out is checked before
/// the win check, so a frame that both empties the formation and kills the
/// player ends in game over.
pub fn step(state: &mut SimulationState, input: &InputCommand, config: &GameConfig, rng: &mut impl Rng) {
    if state.status.is_terminal() {
        return;
    }

    state.frame += 1;
    state.clock_ms += config.frame_ms;

    move_player(state, input);
    fire_player(state, input, config);
    advance_projectiles(state);
    extensions::update(state, &config.extensions);
    advance_formation(state);

    if invaded(state) {
        debug!(frame = state.frame, "Formation reached the player line");
        state.status = StepStatus::GameOver(GameOverCause::Invaded);
        return;
    }

    enemy_fire(state, config, rng);
    resolve_shots_vs_enemies(state, config, rng);
    resolve_shots_vs_player(state);

    if state.lives == 0 {
        debug!(frame = state.frame, score = state.score, "Lives exhausted");
        state.status = StepStatus::GameOver(GameOverCause::LivesExhausted);
        return;
    }

    if state.enemies.is_empty() {
        debug!(frame = state.frame, score = state.score, "Formation cleared");
        state.status = StepStatus::LevelComplete;
    }

    trace!(
        frame = state.frame,
        enemies = state.enemies.len(),
        shots = state.player_shots.len(),
        enemy_shots = state.enemy_shots.len(),
        "Step complete"
    );
}

fn move_player(state: &mut SimulationState, input: &InputCommand) {
    let player = &mut state.player;
    let max_x = (state.width - player.bounds.w).max(0.0);

    if let Some(target) = input.drag_x {
        player.bounds.x = (target - player.bounds.w / 2.0).clamp(0.0, max_x);
        return;
    }

    let mut dx = 0.0;
    if input.move_left {
        dx -= player.speed;
    }
    if input.move_right {
        dx += player.speed;
    }
    player.bounds.x = (player.bounds.x + dx).clamp(0.0, max_x);
}

fn fire_player(state: &mut SimulationState, input: &InputCommand, config: &GameConfig) {
    if !input.fire {
        return;
    }

    let cooldown = (config.fire_cooldown() * extensions::cooldown_factor(&state.extensions))
        .max(crate::config::MIN_FIRE_COOLDOWN_MS);
    let ready = state
        .last_shot_ms
        .map_or(true, |last| state.clock_ms - last > cooldown);
    if !ready {
        return;
    }

    let p = &state.player.bounds;
    let bounds = Rect::new(
        p.center_x() - config.player_shot_width / 2.0,
        p.y - config.player_shot_height,
        config.player_shot_width,
        config.player_shot_height,
    );
    let vy = -config.player_shot_speed();

    match extensions::fire_pattern(&state.extensions) {
        FirePattern::Single => {
            state.player_shots.push(Projectile::new(bounds, vy, Owner::Player));
        }
        FirePattern::Spread => {
            for vx in [-SPREAD_DRIFT, 0.0, SPREAD_DRIFT] {
                state.player_shots.push(Projectile {
                    vx,
                    ..Projectile::new(bounds, vy, Owner::Player)
                });
            }
        }
    }
    state.last_shot_ms = Some(state.clock_ms);
}

/// Move every projectile and drop the ones that have fully left the field.
fn advance_projectiles(state: &mut SimulationState) {
    let (width, height) = (state.width, state.height);

    state.player_shots.retain_mut(|shot| {
        shot.bounds.x += shot.vx;
        shot.bounds.y += shot.vy;
        shot.bounds.bottom() > 0.0 && shot.bounds.right() > 0.0 && shot.bounds.x < width
    });

    state.enemy_shots.retain_mut(|shot| {
        shot.bounds.y += shot.vy;
        shot.bounds.y < height
    });
}

/// Slide the formation sideways, or reverse and drop it as a whole when any
/// member would cross an edge.
fn advance_formation(state: &mut SimulationState) {
    if state.enemies.is_empty() {
        return;
    }

    let dx = state.formation.heading.sign() * state.formation.speed;
    let width = state.width;
    let hits_edge = state
        .enemies
        .iter()
        .any(|e| e.bounds.x + dx < 0.0 || e.bounds.right() + dx > width);

    if hits_edge {
        state.formation.heading = state.formation.heading.reversed();
        let drop = state.formation.drop_distance;
        for enemy in &mut state.enemies {
            enemy.bounds.y += drop;
        }
        trace!(heading = ?state.formation.heading, "Formation reversed");
    } else {
        for enemy in &mut state.enemies {
            enemy.bounds.x += dx;
        }
    }
}

fn invaded(state: &SimulationState) -> bool {
    state
        .enemies
        .iter()
        .map(|e| e.bounds.bottom())
        .fold(None, |lowest: Option<f32>, b| Some(lowest.map_or(b, |l| l.max(b))))
        .is_some_and(|lowest| lowest >= state.player.bounds.y)
}

/// Indices of the lowest live enemy in each column.
fn front_row(enemies: &[Enemy]) -> Vec<usize> {
    let mut fronts: Vec<usize> = Vec::new();
    for (i, enemy) in enemies.iter().enumerate() {
        match fronts.iter_mut().find(|j| enemies[**j].column == enemy.column) {
            Some(j) if enemies[*j].bounds.y < enemy.bounds.y => *j = i,
            Some(_) => {}
            None => fronts.push(i),
        }
    }
    fronts
}

fn enemy_fire(state: &mut SimulationState, config: &GameConfig, rng: &mut impl Rng) {
    if state.enemies.is_empty() {
        return;
    }
    let chance = probability(config.enemy_fire_chance_for(state.level));
    if !rng.gen_bool(chance) {
        return;
    }

    let shooter = match config.shooter_policy {
        ShooterPolicy::Random => rng.gen_range(0..state.enemies.len()),
        ShooterPolicy::FrontRow => {
            let fronts = front_row(&state.enemies);
            fronts[rng.gen_range(0..fronts.len())]
        }
    };

    let e = &state.enemies[shooter].bounds;
    let bounds = Rect::new(
        e.center_x() - config.enemy_shot_width / 2.0,
        e.bottom(),
        config.enemy_shot_width,
        config.enemy_shot_height,
    );
    state
        .enemy_shots
        .push(Projectile::new(bounds, config.enemy_shot_speed_for(state.level), Owner::Enemy));
}

/// Each shot destroys at most the first enemy it overlaps, in collection
/// order; a destroyed enemy leaves the collection and cannot be hit twice.
fn resolve_shots_vs_enemies(state: &mut SimulationState, config: &GameConfig, rng: &mut impl Rng) {
    let mut i = 0;
    while i < state.player_shots.len() {
        let shot = state.player_shots[i].bounds;
        match state.enemies.iter().position(|e| e.bounds.overlaps(&shot)) {
            Some(hit) => {
                let enemy = state.enemies.remove(hit);
                state.player_shots.remove(i);
                state.score += enemy.tier.points();
                extensions::on_enemy_destroyed(&mut state.extensions, &enemy.bounds, &config.extensions, rng);
            }
            None => i += 1,
        }
    }
}

fn resolve_shots_vs_player(state: &mut SimulationState) {
    let player = state.player.bounds;
    let before = state.enemy_shots.len();
    state.enemy_shots.retain(|shot| !shot.bounds.overlaps(&player));
    let hits = before - state.enemy_shots.len();

    for _ in 0..hits {
        if !extensions::absorb_hit(&mut state.extensions) {
            state.lives = state.lives.saturating_sub(1);
        }
    }
}
