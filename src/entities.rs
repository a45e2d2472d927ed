/// All game entity types. Pure data, no logic beyond geometry helpers.
use serde::{Deserialize, Serialize};

use crate::extensions::Extension;

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Axis-aligned bounding box in playfield coordinates (y grows downward).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap: boxes that only share an edge do not collide.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }
}

// ── Player & projectiles ──────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub bounds: Rect,
    /// Horizontal distance covered per frame of held movement.
    pub speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Enemy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub bounds: Rect,
    /// Signed vertical velocity per frame; player shots are negative.
    pub vy: f32,
    /// Horizontal drift per frame (spread shots only).
    pub vx: f32,
    pub owner: Owner,
}

impl Projectile {
    pub fn new(bounds: Rect, vy: f32, owner: Owner) -> Self {
        Self {
            bounds,
            vy,
            vx: 0.0,
            owner,
        }
    }
}

// ── Enemies ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyTier {
    Small,
    Medium,
    Large,
}

impl EnemyTier {
    /// Tier for a formation row: the top row is small, the next two medium,
    /// the rest large.
    pub fn for_row(row: usize) -> Self {
        match row {
            0 => EnemyTier::Small,
            1 | 2 => EnemyTier::Medium,
            _ => EnemyTier::Large,
        }
    }

    pub fn points(self) -> u32 {
        match self {
            EnemyTier::Small => 30,
            EnemyTier::Medium => 20,
            EnemyTier::Large => 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub bounds: Rect,
    pub tier: EnemyTier,
    /// Column in the spawn grid, used by the front-row shooter
    /// policy.
    pub column: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Heading {
    Left,
    Right,
}

impl Heading {
    pub fn sign(self) -> f32 {
        match self {
            Heading::Left => -1.0,
            Heading::Right => 1.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Heading::Left => Heading::Right,
            Heading::Right => Heading::Left,
        }
    }
}

/// Shared motion of every live enemy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    pub heading: Heading,
    pub speed: f32,
    pub drop_distance: f32,
}

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverCause {
    LivesExhausted,
    Invaded,
}

/// Outcome of the most recent step.  Anything but `Running` is terminal for
/// the simulation; the session decides what happens next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Running,
    GameOver(GameOverCause),
    LevelComplete,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        self != StepStatus::Running
    }
}

// ── Master simulation state ───────────────────────────────────────────────────

/// Everything the simulation step reads and writes, as one owned value.
/// Cooldown timers are fields here rather than host-side globals, so the
/// whole state can be cloned, compared and serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub width: f32,
    pub height: f32,
    pub player: Player,
    pub player_shots: Vec<Projectile>,
    pub enemy_shots: Vec<Projectile>,
    pub enemies: Vec<Enemy>,
    pub formation: Formation,
    pub score: u32,
    pub lives: u32,
    pub level: u32,
    /// Simulated milliseconds since the state was created.
    pub clock_ms: f32,
    /// Simulated time of the last player shot, if any.
    pub last_shot_ms: Option<f32>,
    pub frame: u64,
    pub status: StepStatus,
    pub extensions: Vec<Extension>,
}
