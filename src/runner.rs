//! Runner mini-game: jump over or duck under obstacles scrolling in from the
//! right.  Shares the bounding-box collision rule and the high score policy
//! with the shooter but has its own small state machine.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::probability;
use crate::entities::Rect;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub width: f32,
    pub height: f32,
    /// Top edge of the runner while standing on the ground.
    pub ground_y: f32,
    /// Height of the ground strip at the bottom of the field.
    pub ground_depth: f32,
    pub runner_x: f32,
    pub jump_impulse: f32,
    pub gravity: f32,
    pub start_speed: f32,
    pub speed_step: f32,
    /// Score interval between speed increases.
    pub speed_every: u32,
    pub obstacle_chance: f32,
    pub cloud_chance: f32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 200.0,
            ground_y: 120.0,
            ground_depth: 30.0,
            runner_x: 80.0,
            jump_impulse: 18.0,
            gravity: 1.5,
            start_speed: 5.0,
            speed_step: 0.5,
            speed_every: 100,
            obstacle_chance: 0.005,
            cloud_chance: 0.002,
        }
    }
}

const STAND_SIZE: (f32, f32) = (40.0, 40.0);
const DUCK_SIZE: (f32, f32) = (50.0, 20.0);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    pub x: f32,
    pub y: f32,
    pub jump_power: f32,
    pub airborne: bool,
    pub ducking: bool,
}

impl Runner {
    /// Ducking trades height for width and hugs the ground.
    pub fn hitbox(&self) -> Rect {
        if self.ducking {
            Rect::new(self.x, self.y + (STAND_SIZE.1 - DUCK_SIZE.1), DUCK_SIZE.0, DUCK_SIZE.1)
        } else {
            Rect::new(self.x, self.y, STAND_SIZE.0, STAND_SIZE.1)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cloud {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerInput {
    /// Edge-triggered: only starts a jump from the ground.
    pub jump: bool,
    /// Held: ducks while on the ground.
    pub duck: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunnerState {
    pub width: f32,
    pub height: f32,
    pub ground_line: f32,
    pub runner: Runner,
    pub obstacles: Vec<Rect>,
    pub clouds: Vec<Cloud>,
    pub ground_offset: f32,
    pub speed: f32,
    pub score: u32,
    pub crashed: bool,
}

impl RunnerState {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            ground_line: config.height - config.ground_depth,
            runner: Runner {
                x: config.runner_x,
                y: config.ground_y,
                jump_power: 0.0,
                airborne: false,
                ducking: false,
            },
            obstacles: Vec::new(),
            clouds: Vec::new(),
            ground_offset: 0.0,
            speed: config.start_speed.max(0.5),
            score: 0,
            crashed: false,
        }
    }
}

/// Advance the runner by one frame.  Returns true if the runner crashed this
/// frame; a crashed state is left untouched.
pub fn step(state: &mut RunnerState, input: RunnerInput, config: &RunnerConfig, rng: &mut impl Rng) -> bool {
    if state.crashed {
        return false;
    }

    let runner = &mut state.runner;
    if input.jump && !runner.airborne {
        runner.airborne = true;
        runner.jump_power = config.jump_impulse;
    }
    runner.ducking = input.duck && !runner.airborne;

    if runner.airborne {
        runner.y -= runner.jump_power;
        runner.jump_power -= config.gravity;
        if runner.y >= config.ground_y {
            runner.y = config.ground_y;
            runner.airborne = false;
            runner.jump_power = 0.0;
        }
    }

    state.ground_offset += state.speed;

    if rng.gen_bool(probability(config.obstacle_chance)) {
        let y = if rng.gen_bool(0.5) { config.ground_y } else { config.ground_y + 20.0 };
        state.obstacles.push(Rect::new(
            state.width,
            y,
            rng.gen_range(20.0..40.0),
            rng.gen_range(40.0..60.0),
        ));
    }
    if rng.gen_bool(probability(config.cloud_chance)) {
        state.clouds.push(Cloud {
            x: state.width,
            y: rng.gen_range(30.0..70.0),
            speed: rng.gen_range(1.0..2.0),
        });
    }

    let speed = state.speed;
    state.obstacles.retain_mut(|o| {
        o.x -= speed;
        o.right() > 0.0
    });
    state.clouds.retain_mut(|c| {
        c.x -= c.speed;
        c.x > -50.0
    });

    let hitbox = state.runner.hitbox();
    if state.obstacles.iter().any(|o| o.overlaps(&hitbox)) {
        debug!(score = state.score, "Runner crashed");
        state.crashed = true;
        return true;
    }

    state.score += 1;
    if config.speed_every > 0 && state.score % config.speed_every == 0 {
        state.speed += config.speed_step;
    }
    false
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerPhase {
    Idle,
    Playing,
    GameOver,
}

/// Start / reset controller for the runner.
pub struct RunnerGame {
    config: RunnerConfig,
    state: RunnerState,
    phase: RunnerPhase,
    high_score: u32,
}

impl RunnerGame {
    pub fn new(config: RunnerConfig, high_score: u32) -> Self {
        let state = RunnerState::new(&config);
        Self {
            config,
            state,
            phase: RunnerPhase::Idle,
            high_score,
        }
    }

    pub fn phase(&self) -> RunnerPhase {
        self.phase
    }

    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// Starts from Idle or after a crash.
    pub fn start(&mut self) {
        if self.phase == RunnerPhase::Playing {
            return;
        }
        self.state = RunnerState::new(&self.config);
        self.phase = RunnerPhase::Playing;
        info!("Runner started");
    }

    pub fn reset(&mut self) {
        self.state = RunnerState::new(&self.config);
        self.phase = RunnerPhase::Idle;
    }

    pub fn frame(&mut self, input: RunnerInput, rng: &mut impl Rng) {
        if self.phase != RunnerPhase::Playing {
            return;
        }
        if step(&mut self.state, input, &self.config, rng) {
            self.phase = RunnerPhase::GameOver;
            if self.state.score > self.high_score {
                self.high_score = self.state.score;
                info!(high_score = self.high_score, "New runner high score");
            }
        }
    }
}
