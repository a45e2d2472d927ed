/// Rendering layer: a read-only projection of simulation state onto a
/// raster [`Surface`].
///
/// Simulation coordinates never depend on the output size: every draw goes
/// through a [`Viewport`] that scales playfield units to surface units, so a
/// resized terminal (or any other surface) keeps the game logic untouched.
/// No function here takes a mutable reference to game state.
use crossterm::style::Color;

use crate::entities::{EnemyTier, Rect, SimulationState};
use crate::extensions::{Extension, PowerUpKind};
use crate::runner::RunnerState;

// ── Colour palette ────────────────────────────────────────────────────────────

pub const C_BACKGROUND: Color = Color::Rgb { r: 0x1a, g: 0x1a, b: 0x2e };
const C_STAR_BRIGHT: Color = Color::Rgb { r: 0x4a, g: 0x90, b: 0xe2 };
const C_STAR_DIM: Color = Color::Rgb { r: 0x2a, g: 0x4a, b: 0x72 };
const C_PLAYER: Color = Color::Rgb { r: 0x4a, g: 0x90, b: 0xe2 };
const C_ENEMY_SMALL: Color = Color::Rgb { r: 0xff, g: 0x6b, b: 0x35 };
const C_ENEMY_MEDIUM: Color = Color::Rgb { r: 0xff, g: 0x8c, b: 0x42 };
const C_ENEMY_LARGE: Color = Color::Rgb { r: 0xff, g: 0xad, b: 0x42 };
const C_BULLET_PLAYER: Color = Color::Cyan;
const C_BULLET_ENEMY: Color = Color::Magenta;
const C_DROP_SPREAD: Color = Color::Yellow;
const C_DROP_RAPID: Color = Color::Cyan;
const C_DROP_LIFE: Color = Color::Red;

const C_SKY: Color = Color::Rgb { r: 0xbf, g: 0xdb, b: 0xfe };
const C_GROUND: Color = Color::Rgb { r: 0x6b, g: 0x72, b: 0x80 };
const C_GROUND_DARK: Color = Color::Rgb { r: 0x4b, g: 0x55, b: 0x63 };
const C_RUNNER: Color = Color::Rgb { r: 0xf9, g: 0x73, b: 0x16 };
const C_CACTUS: Color = Color::Rgb { r: 0x37, g: 0x41, b: 0x51 };
const C_CLOUD: Color = Color::Rgb { r: 0xf3, g: 0xf4, b: 0xf6 };

pub const STAR_COUNT: usize = 30;

/// A raster output target measured in whole units (pixels, terminal cells).
pub trait Surface {
    fn size(&self) -> (u16, u16);
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color);

    fn plot(&mut self, x: i32, y: i32, color: Color) {
        self.fill_rect(x, y, 1, 1, color);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Drawn,
    /// The surface had no area; nothing was drawn.
    Skipped,
}

/// Scale transform from playfield units to surface units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub sx: f32,
    pub sy: f32,
}

impl Viewport {
    /// `None` when either dimension is zero.
    pub fn fit(playfield: (f32, f32), surface: (u16, u16)) -> Option<Self> {
        let (pw, ph) = playfield;
        let (sw, sh) = surface;
        if sw == 0 || sh == 0 || pw <= 0.0 || ph <= 0.0 {
            return None;
        }
        Some(Self {
            sx: sw as f32 / pw,
            sy: sh as f32 / ph,
        })
    }

    /// Floor the leading edges and ceil the trailing ones, so anything with
    /// area covers at least one unit.
    pub fn project(&self, r: &Rect) -> (i32, i32, u32, u32) {
        let x0 = (r.x * self.sx).floor();
        let y0 = (r.y * self.sy).floor();
        let x1 = (r.right() * self.sx).ceil().max(x0 + 1.0);
        let y1 = (r.bottom() * self.sy).ceil().max(y0 + 1.0);
        (x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32)
    }

    pub fn project_point(&self, x: f32, y: f32) -> (i32, i32) {
        ((x * self.sx).floor() as i32, (y * self.sy).floor() as i32)
    }

    /// Inverse transform, for turning pointer positions into playfield units.
    pub fn unproject(&self, x: f32, y: f32) -> (f32, f32) {
        (x / self.sx, y / self.sy)
    }
}

fn fill<S: Surface>(surface: &mut S, view: &Viewport, r: &Rect, color: Color) {
    let (x, y, w, h) = view.project(r);
    surface.fill_rect(x, y, w, h, color);
}

// ── Shooter ───────────────────────────────────────────────────────────────────

/// Fixed star positions in playfield units.
pub fn star_positions(width: f32, height: f32) -> impl Iterator<Item = (usize, f32, f32)> {
    let (w, h) = (width.max(1.0) as usize, height.max(1.0) as usize);
    (0..STAR_COUNT).map(move |i| (i, ((i * 123) % w) as f32, ((i * 456) % h) as f32))
}

/// Cosmetic per-star flicker driven by simulated time.
fn star_color(index: usize, clock_ms: f32) -> Color {
    let phase = clock_ms / 250.0 + index as f32 * 0.7;
    if phase.sin() > -0.3 {
        C_STAR_BRIGHT
    } else {
        C_STAR_DIM
    }
}

pub fn enemy_color(tier: EnemyTier) -> Color {
    match tier {
        EnemyTier::Small => C_ENEMY_SMALL,
        EnemyTier::Medium => C_ENEMY_MEDIUM,
        EnemyTier::Large => C_ENEMY_LARGE,
    }
}

/// Draw one frame, back to front: background, stars, player, enemies,
/// player shots, enemy shots.  Power-up drops go last so they stay visible.
pub fn render<S: Surface>(surface: &mut S, state: &SimulationState) -> RenderOutcome {
    let Some(view) = Viewport::fit((state.width, state.height), surface.size()) else {
        return RenderOutcome::Skipped;
    };

    surface.clear(C_BACKGROUND);

    for (i, x, y) in star_positions(state.width, state.height) {
        let (px, py) = view.project_point(x, y);
        surface.plot(px, py, star_color(i, state.clock_ms));
    }

    let p = &state.player.bounds;
    fill(surface, &view, p, C_PLAYER);
    let turret = Rect::new(p.center_x() - 2.0, p.y - 5.0, 4.0, 8.0);
    fill(surface, &view, &turret, C_PLAYER);

    for enemy in &state.enemies {
        let b = &enemy.bounds;
        fill(surface, &view, b, enemy_color(enemy.tier));
        // Eyes only survive projection when the surface is fine enough.
        if view.sx * b.w >= 8.0 {
            fill(surface, &view, &Rect::new(b.x + 4.0, b.y + 4.0, 3.0, 3.0), C_BACKGROUND);
            fill(surface, &view, &Rect::new(b.right() - 7.0, b.y + 4.0, 3.0, 3.0), C_BACKGROUND);
        }
    }

    for shot in &state.player_shots {
        fill(surface, &view, &shot.bounds, C_BULLET_PLAYER);
    }
    for shot in &state.enemy_shots {
        fill(surface, &view, &shot.bounds, C_BULLET_ENEMY);
    }

    for ext in &state.extensions {
        if let Extension::PowerUps(power) = ext {
            for drop in &power.drops {
                let color = match drop.kind {
                    PowerUpKind::SpreadShot => C_DROP_SPREAD,
                    PowerUpKind::RapidFire => C_DROP_RAPID,
                    PowerUpKind::ExtraLife => C_DROP_LIFE,
                };
                fill(surface, &view, &drop.bounds, color);
            }
        }
    }

    RenderOutcome::Drawn
}

// ── Runner ────────────────────────────────────────────────────────────────────

pub fn render_runner<S: Surface>(surface: &mut S, state: &RunnerState) -> RenderOutcome {
    let Some(view) = Viewport::fit((state.width, state.height), surface.size()) else {
        return RenderOutcome::Skipped;
    };

    surface.clear(C_SKY);

    let ground = Rect::new(0.0, state.ground_line, state.width, state.height - state.ground_line);
    fill(surface, &view, &ground, C_GROUND);
    let mut stripe = -(state.ground_offset % 20.0);
    while stripe < state.width {
        fill(surface, &view, &Rect::new(stripe.max(0.0), state.ground_line, 2.0, ground.h), C_GROUND_DARK);
        stripe += 20.0;
    }

    for cloud in &state.clouds {
        fill(surface, &view, &Rect::new(cloud.x - 15.0, cloud.y - 10.0, 60.0, 20.0), C_CLOUD);
    }

    fill(surface, &view, &state.runner.hitbox(), C_RUNNER);

    for obstacle in &state.obstacles {
        fill(surface, &view, obstacle, C_CACTUS);
    }

    RenderOutcome::Drawn
}
