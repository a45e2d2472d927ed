/// Optional gameplay extensions (shields and power-ups).
///
/// Extensions are a tagged variant stored on the simulation state.  The core
/// step calls the free functions below at fixed points; with an empty
/// extension list every hook is a no-op, so the core loop behaves the same
/// whether or not the features are compiled in or configured.
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{probability, ExtensionConfig};
use crate::entities::{Rect, SimulationState};

const DROP_SIZE: f32 = 12.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Three shots per trigger, fanned out.
    SpreadShot,
    /// Halves the fire cooldown (still subject to the cooldown floor).
    RapidFire,
    /// Instantly adds one life, up to the configured maximum.
    ExtraLife,
}

impl PowerUpKind {
    const ALL: [PowerUpKind; 3] = [PowerUpKind::SpreadShot, PowerUpKind::RapidFire, PowerUpKind::ExtraLife];

    fn is_timed(self) -> bool {
        !matches!(self, PowerUpKind::ExtraLife)
    }
}

/// A power-up falling toward the player's row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerUpDrop {
    pub bounds: Rect,
    pub kind: PowerUpKind,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerUpState {
    pub drops: Vec<PowerUpDrop>,
    /// Active timed power-up and its remaining frames.
    pub active: Option<(PowerUpKind, u32)>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Extension {
    /// Absorbs enemy hits while charges remain.
    Shield { charges: u32 },
    PowerUps(PowerUpState),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirePattern {
    Single,
    Spread,
}

/// Build the extension list for a fresh level.
pub fn from_config(config: &ExtensionConfig) -> Vec<Extension> {
    let mut extensions = Vec::new();
    if config.shield_charges > 0 {
        extensions.push(Extension::Shield {
            charges: config.shield_charges,
        });
    }
    if config.power_ups {
        extensions.push(Extension::PowerUps(PowerUpState::default()));
    }
    extensions
}

fn active_power_up(extensions: &[Extension]) -> Option<PowerUpKind> {
    extensions.iter().find_map(|ext| match ext {
        Extension::PowerUps(state) => state.active.map(|(kind, _)| kind),
        _ => None,
    })
}

pub fn fire_pattern(extensions: &[Extension]) -> FirePattern {
    match active_power_up(extensions) {
        Some(PowerUpKind::SpreadShot) => FirePattern::Spread,
        _ => FirePattern::Single,
    }
}

/// Multiplier applied to the fire cooldown before it is clamped.
pub fn cooldown_factor(extensions: &[Extension]) -> f32 {
    match active_power_up(extensions) {
        Some(PowerUpKind::RapidFire) => 0.5,
        _ => 1.0,
    }
}

/// Returns true if a shield soaked up the hit.
pub fn absorb_hit(extensions: &mut [Extension]) -> bool {
    for ext in extensions.iter_mut() {
        if let Extension::Shield { charges } = ext {
            if *charges > 0 {
                *charges -= 1;
                debug!(remaining = *charges, "Shield absorbed hit");
                return true;
            }
        }
    }
    false
}

pub fn shield_charges(extensions: &[Extension]) -> u32 {
    extensions
        .iter()
        .map(|ext| match ext {
            Extension::Shield { charges } => *charges,
            _ => 0,
        })
        .sum()
}

/// Possibly spawn a drop where an enemy died.
pub fn on_enemy_destroyed(
    extensions: &mut [Extension],
    at: &Rect,
    config: &ExtensionConfig,
    rng: &mut impl Rng,
) {
    for ext in extensions.iter_mut() {
        if let Extension::PowerUps(state) = ext {
            let chance = probability(config.power_up_drop_chance);
            if rng.gen_bool(chance) {
                let kind = PowerUpKind::ALL[rng.gen_range(0..PowerUpKind::ALL.len())];
                state.drops.push(PowerUpDrop {
                    bounds: Rect::new(at.center_x() - DROP_SIZE / 2.0, at.y, DROP_SIZE, DROP_SIZE),
                    kind,
                });
            }
        }
    }
}

/// Advance drops, collect any that touch the player and count down the
/// active power-up.
pub fn update(state: &mut SimulationState, config: &ExtensionConfig) {
    let player = state.player.bounds;
    let height = state.height;
    let mut lives = state.lives;

    for ext in state.extensions.iter_mut() {
        let Extension::PowerUps(power) = ext else {
            continue;
        };

        if let Some((kind, frames)) = power.active.as_mut() {
            *frames = frames.saturating_sub(1);
            if *frames == 0 {
                debug!(?kind, "Power-up expired");
                power.active = None;
            }
        }

        let mut collected = Vec::new();
        power.drops.retain_mut(|drop| {
            drop.bounds.y += config.power_up_fall_speed.max(0.5);
            if drop.bounds.overlaps(&player) {
                collected.push(drop.kind);
                return false;
            }
            drop.bounds.y < height
        });

        for kind in collected {
            debug!(?kind, "Power-up collected");
            if kind.is_timed() {
                power.active = Some((kind, config.power_up_duration.max(1)));
            } else {
                lives = (lives + 1).min(config.max_lives.max(lives));
            }
        }
    }

    state.lives = lives;
}
