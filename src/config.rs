/// Tunable game parameters.
///
/// [`GameConfig`] replaces the per-variant constants with a single struct.
/// Every field has a compile-time default, and a TOML file may override any
/// subset of them (missing keys keep the default).  Level scaling lives here
/// too, clamped at the point of use so a bad formula or file can never yield
/// a negative speed or a zero cooldown.
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GameError, GameResult};
use crate::runner::RunnerConfig;

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const PLAYFIELD_WIDTH: f32 = 800.0;
pub const PLAYFIELD_HEIGHT: f32 = 600.0;

pub const PLAYER_WIDTH: f32 = 30.0;
pub const PLAYER_HEIGHT: f32 = 20.0;
pub const PLAYER_SPEED: f32 = 5.0;
/// Distance from the bottom edge to the player's top edge.
pub const PLAYER_BOTTOM_OFFSET: f32 = 40.0;

pub const PLAYER_SHOT_WIDTH: f32 = 4.0;
pub const PLAYER_SHOT_HEIGHT: f32 = 10.0;
pub const PLAYER_SHOT_SPEED: f32 = 8.0;

pub const ENEMY_SHOT_WIDTH: f32 = 4.0;
pub const ENEMY_SHOT_HEIGHT: f32 = 8.0;
pub const ENEMY_SHOT_SPEED: f32 = 3.0;
pub const ENEMY_SHOT_SPEED_PER_LEVEL: f32 = 0.5;

pub const FIRE_COOLDOWN_MS: f32 = 200.0;
pub const FRAME_MS: f32 = 1000.0 / 60.0;

pub const FORMATION_ROWS: usize = 4;
pub const FORMATION_COLS: usize = 8;
pub const ENEMY_WIDTH: f32 = 25.0;
pub const ENEMY_HEIGHT: f32 = 20.0;
pub const ENEMY_SPACING: f32 = 8.0;
pub const FORMATION_ORIGIN_X: f32 = 80.0;
pub const FORMATION_ORIGIN_Y: f32 = 40.0;
pub const FORMATION_SPEED: f32 = 1.0;
pub const FORMATION_SPEED_PER_LEVEL: f32 = 0.5;
pub const DROP_DISTANCE: f32 = 15.0;

pub const ENEMY_FIRE_CHANCE: f32 = 0.02;
pub const ENEMY_FIRE_CHANCE_PER_LEVEL: f32 = 0.005;
pub const ENEMY_FIRE_CHANCE_MAX: f32 = 0.2;

pub const STARTING_LIVES: u32 = 3;

// ── Clamp floors ──────────────────────────────────────────────────────────────

pub const MIN_FIRE_COOLDOWN_MS: f32 = 50.0;
pub const MIN_FORMATION_SPEED: f32 = 0.1;
pub const MIN_PROJECTILE_SPEED: f32 = 0.5;

/// Which live enemy gets to shoot when the per-frame fire roll succeeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ShooterPolicy {
    /// Uniformly random among all live enemies.
    #[default]
    Random,
    /// Uniformly random among the lowest live enemy of each column.
    FrontRow,
}

/// How pointer input moves the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// On-screen left / right / fire buttons.
    #[default]
    Buttons,
    /// Dragging anywhere outside the fire button positions the player directly.
    Drag,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Multipliers for (formation speed, enemy fire chance).
    fn factors(self) -> (f32, f32) {
        match self {
            Difficulty::Easy => (0.7, 0.5),
            Difficulty::Medium => (1.0, 1.0),
            Difficulty::Hard => (1.5, 2.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }

    /// Scale a config in place.
    pub fn apply(self, config: &mut GameConfig) {
        let (speed, fire) = self.factors();
        config.formation_speed *= speed;
        config.formation_speed_per_level *= speed;
        config.enemy_fire_chance *= fire;
        config.enemy_fire_chance_per_level *= fire;
    }
}

/// Optional gameplay extensions.  Disabled extensions leave the core loop
/// untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Hits absorbed by the player's shield per level; 0 disables shields.
    pub shield_charges: u32,
    pub power_ups: bool,
    /// Chance a destroyed enemy drops a power-up.
    pub power_up_drop_chance: f32,
    pub power_up_fall_speed: f32,
    /// Frames a timed power-up stays active.
    pub power_up_duration: u32,
    pub max_lives: u32,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            shield_charges: 0,
            power_ups: false,
            power_up_drop_chance: 0.1,
            power_up_fall_speed: 2.0,
            power_up_duration: 600,
            max_lives: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // ── Playfield ─────────────────────────────────────────────────────────────
    pub width: f32,
    pub height: f32,

    // ── Player ────────────────────────────────────────────────────────────────
    pub player_width: f32,
    pub player_height: f32,
    pub player_speed: f32,
    pub player_bottom_offset: f32,
    pub starting_lives: u32,

    // ── Projectiles ───────────────────────────────────────────────────────────
    pub player_shot_width: f32,
    pub player_shot_height: f32,
    pub player_shot_speed: f32,
    pub enemy_shot_width: f32,
    pub enemy_shot_height: f32,
    pub enemy_shot_speed: f32,
    pub enemy_shot_speed_per_level: f32,
    pub fire_cooldown_ms: f32,
    pub frame_ms: f32,

    // ── Formation ─────────────────────────────────────────────────────────────
    pub formation_rows: usize,
    pub formation_cols: usize,
    pub enemy_width: f32,
    pub enemy_height: f32,
    pub enemy_spacing: f32,
    pub formation_origin_x: f32,
    pub formation_origin_y: f32,
    pub formation_speed: f32,
    pub formation_speed_per_level: f32,
    pub drop_distance: f32,

    // ── Enemy fire ────────────────────────────────────────────────────────────
    pub enemy_fire_chance: f32,
    pub enemy_fire_chance_per_level: f32,
    pub enemy_fire_chance_max: f32,
    pub shooter_policy: ShooterPolicy,

    // ── Host ──────────────────────────────────────────────────────────────────
    pub input_mode: InputMode,
    pub extensions: ExtensionConfig,
    pub runner: RunnerConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: PLAYFIELD_WIDTH,
            height: PLAYFIELD_HEIGHT,
            player_width: PLAYER_WIDTH,
            player_height: PLAYER_HEIGHT,
            player_speed: PLAYER_SPEED,
            player_bottom_offset: PLAYER_BOTTOM_OFFSET,
            starting_lives: STARTING_LIVES,
            player_shot_width: PLAYER_SHOT_WIDTH,
            player_shot_height: PLAYER_SHOT_HEIGHT,
            player_shot_speed: PLAYER_SHOT_SPEED,
            enemy_shot_width: ENEMY_SHOT_WIDTH,
            enemy_shot_height: ENEMY_SHOT_HEIGHT,
            enemy_shot_speed: ENEMY_SHOT_SPEED,
            enemy_shot_speed_per_level: ENEMY_SHOT_SPEED_PER_LEVEL,
            fire_cooldown_ms: FIRE_COOLDOWN_MS,
            frame_ms: FRAME_MS,
            formation_rows: FORMATION_ROWS,
            formation_cols: FORMATION_COLS,
            enemy_width: ENEMY_WIDTH,
            enemy_height: ENEMY_HEIGHT,
            enemy_spacing: ENEMY_SPACING,
            formation_origin_x: FORMATION_ORIGIN_X,
            formation_origin_y: FORMATION_ORIGIN_Y,
            formation_speed: FORMATION_SPEED,
            formation_speed_per_level: FORMATION_SPEED_PER_LEVEL,
            drop_distance: DROP_DISTANCE,
            enemy_fire_chance: ENEMY_FIRE_CHANCE,
            enemy_fire_chance_per_level: ENEMY_FIRE_CHANCE_PER_LEVEL,
            enemy_fire_chance_max: ENEMY_FIRE_CHANCE_MAX,
            shooter_policy: ShooterPolicy::default(),
            input_mode: InputMode::default(),
            extensions: ExtensionConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

impl GameConfig {
    /// Read a TOML file, falling back to defaults for missing keys.
    pub fn load(path: &Path) -> GameResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text).map_err(|err| match err {
            GameError::ConfigParse { source, .. } => GameError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!(path = %path.display(), "Loaded game config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> GameResult<Self> {
        let config: GameConfig = toml::from_str(text).map_err(|source| GameError::ConfigParse {
            path: Default::default(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no clamp can repair.
    pub fn validate(&self) -> GameResult<()> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("player_width", self.player_width),
            ("player_height", self.player_height),
            ("enemy_width", self.enemy_width),
            ("enemy_height", self.enemy_height),
            ("player_shot_width", self.player_shot_width),
            ("player_shot_height", self.player_shot_height),
            ("enemy_shot_width", self.enemy_shot_width),
            ("enemy_shot_height", self.enemy_shot_height),
            ("frame_ms", self.frame_ms),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(GameError::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }
        let finite = [
            ("player_speed", self.player_speed),
            ("player_bottom_offset", self.player_bottom_offset),
            ("player_shot_speed", self.player_shot_speed),
            ("enemy_shot_speed", self.enemy_shot_speed),
            ("enemy_shot_speed_per_level", self.enemy_shot_speed_per_level),
            ("fire_cooldown_ms", self.fire_cooldown_ms),
            ("enemy_spacing", self.enemy_spacing),
            ("formation_origin_x", self.formation_origin_x),
            ("formation_origin_y", self.formation_origin_y),
            ("formation_speed", self.formation_speed),
            ("formation_speed_per_level", self.formation_speed_per_level),
            ("drop_distance", self.drop_distance),
            ("enemy_fire_chance", self.enemy_fire_chance),
            ("enemy_fire_chance_per_level", self.enemy_fire_chance_per_level),
            ("enemy_fire_chance_max", self.enemy_fire_chance_max),
            ("extensions.power_up_drop_chance", self.extensions.power_up_drop_chance),
            ("extensions.power_up_fall_speed", self.extensions.power_up_fall_speed),
            ("runner.width", self.runner.width),
            ("runner.height", self.runner.height),
            ("runner.ground_y", self.runner.ground_y),
            ("runner.ground_depth", self.runner.ground_depth),
            ("runner.runner_x", self.runner.runner_x),
            ("runner.jump_impulse", self.runner.jump_impulse),
            ("runner.gravity", self.runner.gravity),
            ("runner.start_speed", self.runner.start_speed),
            ("runner.speed_step", self.runner.speed_step),
            ("runner.obstacle_chance", self.runner.obstacle_chance),
            ("runner.cloud_chance", self.runner.cloud_chance),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(GameError::InvalidConfig(format!("{name} must be a finite number, got {value}")));
            }
        }
        if self.player_width >= self.width {
            return Err(GameError::InvalidConfig("player is wider than the playfield".into()));
        }
        if self.player_height >= self.height {
            return Err(GameError::InvalidConfig("player is taller than the playfield".into()));
        }
        if self.formation_rows == 0 || self.formation_cols == 0 {
            return Err(GameError::InvalidConfig("formation must have at least one enemy".into()));
        }
        if self.starting_lives == 0 {
            return Err(GameError::InvalidConfig("starting_lives must be at least 1".into()));
        }
        debug!(?self, "Config validated");
        Ok(())
    }

    // ── Level scaling (clamped at point of use) ──────────────────────────────

    pub fn fire_cooldown(&self) -> f32 {
        self.fire_cooldown_ms.max(MIN_FIRE_COOLDOWN_MS)
    }

    pub fn formation_speed_for(&self, level: u32) -> f32 {
        let bonus = level.saturating_sub(1) as f32 * self.formation_speed_per_level;
        (self.formation_speed + bonus).max(MIN_FORMATION_SPEED)
    }

    pub fn enemy_fire_chance_for(&self, level: u32) -> f32 {
        let bonus = level.saturating_sub(1) as f32 * self.enemy_fire_chance_per_level;
        let cap = probability(self.enemy_fire_chance_max) as f32;
        (probability(self.enemy_fire_chance + bonus) as f32).min(cap)
    }

    pub fn enemy_shot_speed_for(&self, level: u32) -> f32 {
        let bonus = level.saturating_sub(1) as f32 * self.enemy_shot_speed_per_level;
        (self.enemy_shot_speed + bonus).max(MIN_PROJECTILE_SPEED)
    }

    pub fn player_shot_speed(&self) -> f32 {
        self.player_shot_speed.max(MIN_PROJECTILE_SPEED)
    }

    pub fn player_y(&self) -> f32 {
        let top = (self.height - self.player_bottom_offset).max(0.0);
        top.min((self.height - self.player_height).max(0.0))
    }
}

/// Clamp a configured chance into `[0, 1]`.  Non-finite values never fire.
pub fn probability(chance: f32) -> f64 {
    if chance.is_finite() {
        chance.clamp(0.0, 1.0) as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_formation_speed_is_clamped() {
        let config = GameConfig {
            formation_speed: -3.0,
            formation_speed_per_level: -1.0,
            ..GameConfig::default()
        };
        assert_eq!(config.formation_speed_for(4), MIN_FORMATION_SPEED);
    }

    #[test]
    fn fire_chance_is_capped() {
        let config = GameConfig::default();
        assert_eq!(config.enemy_fire_chance_for(1000), ENEMY_FIRE_CHANCE_MAX);
    }

    #[test]
    fn tiny_cooldown_is_raised_to_floor() {
        let config = GameConfig {
            fire_cooldown_ms: 0.0,
            ..GameConfig::default()
        };
        assert_eq!(config.fire_cooldown(), MIN_FIRE_COOLDOWN_MS);
    }

    #[test]
    fn non_finite_chance_never_fires() {
        assert_eq!(probability(f32::NAN), 0.0);
        assert_eq!(probability(f32::INFINITY), 0.0);
        assert_eq!(probability(1.5), 1.0);
        assert_eq!(probability(-0.5), 0.0);

        let config = GameConfig {
            enemy_fire_chance: f32::NAN,
            enemy_fire_chance_max: f32::NAN,
            ..GameConfig::default()
        };
        assert_eq!(config.enemy_fire_chance_for(3), 0.0);
    }

    #[test]
    fn oversized_player_stays_on_the_field() {
        let config = GameConfig {
            player_height: 700.0,
            ..GameConfig::default()
        };
        assert_eq!(config.player_y(), 0.0);
    }
}
