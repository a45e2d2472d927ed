//! Session controller: the state machine around the simulation.
//!
//! ```text
//! Idle ──start──▶ Playing ◀──resume── Paused
//!                  │  └────pause────────▲
//!                  ├──▶ GameOver ──start──▶ Playing
//!                  └──▶ LevelComplete ──next_level / start──▶ Playing
//! any ──reset──▶ Idle
//! ```
//!
//! Frames are driven through [`FrameRequest`] tokens.  Only the most recently
//! issued token is honoured; every transition out of `Playing` cancels it and
//! every transition into `Playing` issues a fresh one, so a frame callback
//! that fires late can never step a paused, finished or discarded state.
//! Requests for transitions that are not valid from the current state are
//! ignored.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compute::{self, init_state};
use crate::config::GameConfig;
use crate::display::{self, RenderOutcome, Surface};
use crate::entities::{SimulationState, StepStatus};
use crate::extensions;
use crate::input::{ButtonLayout, DeviceEvent, InputSampler, KeyHold};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Playing,
    Paused,
    GameOver,
    LevelComplete,
}

/// Handle for one scheduled frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRequest(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The request was cancelled or superseded; nothing ran.
    Stale,
    /// One step ran and another frame is scheduled.
    Continued { rendered: bool },
    /// One step ran and reached a terminal state.
    Ended { state: SessionState, rendered: bool },
}

/// Everything the host displays outside the playfield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub score: u32,
    pub high_score: u32,
    pub lives: u32,
    pub level: u32,
    pub shield: u32,
    /// Set when the last terminal entry beat the previous high score.
    pub new_high_score: bool,
}

pub struct Session<R: Rng> {
    config: GameConfig,
    rng: R,
    state: SessionState,
    sim: Option<SimulationState>,
    input: InputSampler,
    pending: Option<FrameRequest>,
    next_request: u64,
    high_score: u32,
    new_high_score: bool,
    steps: u64,
}

impl<R: Rng> Session<R> {
    pub fn new(config: GameConfig, rng: R, high_score: u32, hold: KeyHold) -> Self {
        let layout = ButtonLayout::below(config.width, config.height);
        let input = InputSampler::new(config.input_mode, hold, layout);
        Self {
            config,
            rng,
            state: SessionState::Idle,
            sim: None,
            input,
            pending: None,
            next_request: 0,
            high_score,
            new_high_score: false,
            steps: 0,
        }
    }

    // ── Observers ─────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn simulation(&self) -> Option<&SimulationState> {
        self.sim.as_ref()
    }

    /// Direct access for hosts that stage scenarios (debug tooling, tests).
    pub fn simulation_mut(&mut self) -> Option<&mut SimulationState> {
        self.sim.as_mut()
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Number of simulation steps executed over the session's lifetime.
    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    pub fn button_layout(&self) -> &ButtonLayout {
        self.input.layout()
    }

    /// Device listeners should be attached exactly while this is true.
    pub fn wants_input(&self) -> bool {
        matches!(self.state, SessionState::Playing | SessionState::Paused)
    }

    pub fn view(&self) -> SessionView {
        let (score, lives, level, shield) = match &self.sim {
            Some(sim) => (sim.score, sim.lives, sim.level, extensions::shield_charges(&sim.extensions)),
            None => (0, self.config.starting_lives, 1, 0),
        };
        SessionView {
            state: self.state,
            score,
            high_score: self.high_score,
            lives,
            level,
            shield,
            new_high_score: self.new_high_score,
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    /// Fresh game at level 1.  Valid from Idle, GameOver and LevelComplete.
    pub fn start(&mut self) {
        if !matches!(
            self.state,
            SessionState::Idle | SessionState::GameOver | SessionState::LevelComplete
        ) {
            debug!(state = ?self.state, "Ignoring start");
            return;
        }
        let lives = self.config.starting_lives;
        self.begin_level(1, 0, lives);
        info!("Game started");
    }

    /// Next level with score and lives carried over.  Valid from
    /// LevelComplete only.
    pub fn next_level(&mut self) {
        if self.state != SessionState::LevelComplete {
            debug!(state = ?self.state, "Ignoring next level");
            return;
        }
        let Some(sim) = self.sim.as_ref() else {
            return;
        };
        let (level, score, lives) = (sim.level + 1, sim.score, sim.lives);
        self.begin_level(level, score, lives);
        info!(level, score, "Advanced to next level");
    }

    pub fn pause(&mut self) {
        if self.state != SessionState::Playing {
            return;
        }
        self.state = SessionState::Paused;
        self.pending = None;
        info!("Paused");
    }

    pub fn resume(&mut self) {
        if self.state != SessionState::Paused {
            return;
        }
        self.state = SessionState::Playing;
        self.schedule();
        info!("Resumed");
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            SessionState::Playing => self.pause(),
            SessionState::Paused => self.resume(),
            _ => {}
        }
    }

    /// The host lost visibility or focus.  Key releases may never arrive
    /// while unfocused, so held input is dropped too.
    pub fn focus_lost(&mut self) {
        self.input.clear();
        if self.state == SessionState::Playing {
            debug!("Focus lost, pausing");
            self.pause();
        }
    }

    /// Back to Idle from anywhere, discarding the simulation.  The high score
    /// survives.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.sim = None;
        self.pending = None;
        self.new_high_score = false;
        self.input.clear();
        info!("Session reset");
    }

    fn begin_level(&mut self, level: u32, score: u32, lives: u32) {
        self.sim = Some(init_state(&self.config, level, score, lives));
        self.state = SessionState::Playing;
        self.new_high_score = false;
        self.input.clear();
        self.schedule();
    }

    fn schedule(&mut self) {
        self.next_request += 1;
        self.pending = Some(FrameRequest(self.next_request));
    }

    fn finish(&mut self, terminal: SessionState) {
        self.state = terminal;
        self.pending = None;
        self.input.clear();

        let score = self.sim.as_ref().map_or(0, |sim| sim.score);
        // A tie does not count as a new high score.
        self.new_high_score = score > self.high_score;
        if self.new_high_score {
            self.high_score = score;
        }
        info!(state = ?terminal, score, high_score = self.high_score, "Session reached terminal state");
    }

    // ── Per-frame work ────────────────────────────────────────────────────────

    /// Device events are only accepted while listeners are attached.
    pub fn handle_event(&mut self, event: DeviceEvent) {
        if self.wants_input() {
            self.input.handle(event);
        }
    }

    /// Sample input, step the simulation once and render the result.  Does
    /// nothing unless `request` is the currently scheduled frame.
    pub fn run_frame<S: Surface>(&mut self, request: FrameRequest, surface: &mut S) -> FrameOutcome {
        if self.state != SessionState::Playing || self.pending != Some(request) {
            return FrameOutcome::Stale;
        }
        self.pending = None;

        let Some(sim) = self.sim.as_mut() else {
            return FrameOutcome::Stale;
        };
        let command = self.input.sample();
        compute::step(sim, &command, &self.config, &mut self.rng);
        self.steps += 1;
        let status = sim.status;
        let rendered = display::render(surface, sim) == RenderOutcome::Drawn;

        match status {
            StepStatus::Running => {
                self.schedule();
                FrameOutcome::Continued { rendered }
            }
            StepStatus::GameOver(_) => {
                self.finish(SessionState::GameOver);
                FrameOutcome::Ended {
                    state: SessionState::GameOver,
                    rendered,
                }
            }
            StepStatus::LevelComplete => {
                self.finish(SessionState::LevelComplete);
                FrameOutcome::Ended {
                    state: SessionState::LevelComplete,
                    rendered,
                }
            }
        }
    }

    /// Redraw without stepping: the live simulation, or a preview of a
    /// fresh formation while Idle.
    pub fn redraw<S: Surface>(&self, surface: &mut S) -> RenderOutcome {
        match &self.sim {
            Some(sim) => display::render(surface, sim),
            None => {
                let preview = init_state(&self.config, 1, 0, self.config.starting_lives);
                display::render(surface, &preview)
            }
        }
    }
}
