/// Terminal host. All crossterm I/O lives here.
///
/// The playfield is drawn into a [`TerminalSurface`] (one background colour
/// per cell) and flushed below a one-row HUD.  Under the playfield sits a
/// two-row strip of on-screen buttons for mouse/touch play, then a row of key
/// hints.  This module also translates crossterm events into device events
/// and host commands, and owns the RAII guards that restore the terminal.
use std::io::{self, Write};

use crossterm::{
    cursor,
    event::{
        DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
        KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags, MouseButton,
        MouseEvent, MouseEventKind, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    style::{self, Color, Print},
    terminal, ExecutableCommand, QueueableCommand,
};
use tracing::{debug, warn};

use crate::display::{Surface, Viewport};
use crate::input::{Button, ButtonLayout, DeviceEvent, Key, PointerPhase, PointerSource, BUTTON_STRIP_HEIGHT};
use crate::runner::{RunnerPhase, RunnerState};
use crate::session::{SessionState, SessionView};

const HUD_ROWS: u16 = 1;
const BUTTON_ROWS: u16 = 2;
const HINT_ROWS: u16 = 1;
const MOUSE_POINTER_ID: u64 = 0;

const C_HUD_SCORE: Color = Color::Yellow;
const C_HUD_LIVES: Color = Color::Red;
const C_HUD_LEVEL: Color = Color::Green;
const C_HUD_SHIELD: Color = Color::Cyan;
const C_BUTTON: Color = Color::DarkGrey;
const C_HINT: Color = Color::DarkGrey;
const C_BANNER: Color = Color::White;

// ── Screen layout ─────────────────────────────────────────────────────────────

/// Where each region sits on the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Screen {
    pub cols: u16,
    pub rows: u16,
    pub playfield_top: u16,
    pub playfield_rows: u16,
}

impl Screen {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            playfield_top: HUD_ROWS,
            playfield_rows: rows.saturating_sub(HUD_ROWS + BUTTON_ROWS + HINT_ROWS),
        }
    }

    pub fn buttons_top(&self) -> u16 {
        self.playfield_top + self.playfield_rows
    }

    pub fn hint_row(&self) -> u16 {
        self.buttons_top() + BUTTON_ROWS
    }
}

// ── Cell surface ──────────────────────────────────────────────────────────────

/// A grid of coloured cells standing in for a pixel raster.
pub struct TerminalSurface {
    cols: u16,
    rows: u16,
    cells: Vec<Color>,
}

impl TerminalSurface {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Color::Black; cols as usize * rows as usize],
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        if (cols, rows) != (self.cols, self.rows) {
            debug!(cols, rows, "Resizing terminal surface");
            *self = Self::new(cols, rows);
        }
    }

    pub fn cell(&self, x: u16, y: u16) -> Option<Color> {
        (x < self.cols && y < self.rows).then(|| self.cells[y as usize * self.cols as usize + x as usize])
    }

    /// Write the grid starting at `top`, changing colour only when needed.
    pub fn present<W: Write>(&self, out: &mut W, top: u16) -> io::Result<()> {
        for row in 0..self.rows {
            out.queue(cursor::MoveTo(0, top + row))?;
            let mut current = None;
            for col in 0..self.cols {
                let color = self.cells[row as usize * self.cols as usize + col as usize];
                if current != Some(color) {
                    out.queue(style::SetBackgroundColor(color))?;
                    current = Some(color);
                }
                out.queue(Print(' '))?;
            }
        }
        out.queue(style::ResetColor)?;
        Ok(())
    }
}

impl Surface for TerminalSurface {
    fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    fn clear(&mut self, color: Color) {
        self.cells.fill(color);
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w as i32).min(self.cols as i32);
        let y1 = (y + h as i32).min(self.rows as i32);
        for row in y0..y1 {
            let base = row as usize * self.cols as usize;
            for col in x0..x1 {
                self.cells[base + col as usize] = color;
            }
        }
    }
}

// ── Event translation ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostCommand {
    Start,
    TogglePause,
    NextLevel,
    Reset,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Translated {
    Device(DeviceEvent),
    Command(HostCommand),
    FocusLost,
    Resize(u16, u16),
    Ignored,
}

fn game_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Char('a') | KeyCode::Char('A') => Some(Key::A),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(Key::D),
        KeyCode::Char(' ') => Some(Key::Space),
        _ => None,
    }
}

fn host_command(code: KeyCode, modifiers: KeyModifiers) -> Option<HostCommand> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(HostCommand::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(HostCommand::Quit),
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Enter => Some(HostCommand::Start),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(HostCommand::TogglePause),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(HostCommand::NextLevel),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(HostCommand::Reset),
        _ => None,
    }
}

/// Map a terminal cell to playfield units.  Cells in the button strip land
/// in the middle of the strip below the playfield.
fn cell_to_playfield(screen: &Screen, playfield: (f32, f32), column: u16, row: u16) -> Option<(f32, f32)> {
    let view = Viewport::fit(playfield, (screen.cols, screen.playfield_rows))?;
    let (x, _) = view.unproject(column as f32 + 0.5, 0.0);
    let y = if row < screen.playfield_top {
        return None;
    } else if row < screen.buttons_top() {
        view.unproject(0.0, (row - screen.playfield_top) as f32 + 0.5).1
    } else if row < screen.hint_row() {
        playfield.1 + BUTTON_STRIP_HEIGHT / 2.0
    } else {
        return None;
    };
    Some((x, y))
}

pub fn translate(event: &Event, screen: &Screen, playfield: (f32, f32)) -> Translated {
    match event {
        Event::Key(KeyEvent {
            code, modifiers, kind, ..
        }) => match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                if let Some(key) = game_key(*code) {
                    Translated::Device(DeviceEvent::KeyDown(key))
                } else if *kind == KeyEventKind::Press {
                    host_command(*code, *modifiers).map_or(Translated::Ignored, Translated::Command)
                } else {
                    Translated::Ignored
                }
            }
            KeyEventKind::Release => game_key(*code).map_or(Translated::Ignored, |key| {
                Translated::Device(DeviceEvent::KeyUp(key))
            }),
        },
        Event::Mouse(MouseEvent {
            kind, column, row, ..
        }) => {
            let phase = match kind {
                MouseEventKind::Down(MouseButton::Left) => PointerPhase::Down,
                MouseEventKind::Drag(MouseButton::Left) => PointerPhase::Move,
                MouseEventKind::Up(MouseButton::Left) => PointerPhase::Up,
                _ => return Translated::Ignored,
            };
            match cell_to_playfield(screen, playfield, *column, *row) {
                Some((x, y)) => Translated::Device(DeviceEvent::Pointer {
                    source: PointerSource::Mouse,
                    id: MOUSE_POINTER_ID,
                    phase,
                    x,
                    y,
                }),
                // Leaving the game area mid-gesture ends it.
                None if phase != PointerPhase::Down => Translated::Device(DeviceEvent::Pointer {
                    source: PointerSource::Mouse,
                    id: MOUSE_POINTER_ID,
                    phase: PointerPhase::Cancel,
                    x: 0.0,
                    y: 0.0,
                }),
                None => Translated::Ignored,
            }
        }
        Event::FocusLost => Translated::FocusLost,
        Event::Resize(cols, rows) => Translated::Resize(*cols, *rows),
        _ => Translated::Ignored,
    }
}

// ── Host chrome ───────────────────────────────────────────────────────────────

fn print_at<W: Write>(out: &mut W, col: u16, row: u16, color: Color, text: &str) -> io::Result<()> {
    out.queue(cursor::MoveTo(col, row))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print(text))?;
    Ok(())
}

fn centered<W: Write>(out: &mut W, screen: &Screen, row: u16, color: Color, text: &str) -> io::Result<()> {
    let col = (screen.cols / 2).saturating_sub(text.chars().count() as u16 / 2);
    print_at(out, col, row, color, text)
}

pub fn draw_hud<W: Write>(out: &mut W, screen: &Screen, view: &SessionView) -> io::Result<()> {
    out.queue(cursor::MoveTo(0, 0))?;
    out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;

    print_at(out, 1, 0, C_HUD_SCORE, &format!("Score:{:>6}  Hi:{:>6}", view.score, view.high_score))?;

    let level = format!("[ LEVEL {} ]", view.level);
    centered(out, screen, 0, C_HUD_LEVEL, &level)?;

    let mut right = format!("Lives:{}", "♥".repeat(view.lives as usize));
    if view.shield > 0 {
        right = format!("Shield:{}  {}", view.shield, right);
    }
    let col = screen.cols.saturating_sub(right.chars().count() as u16 + 1);
    let color = if view.shield > 0 { C_HUD_SHIELD } else { C_HUD_LIVES };
    print_at(out, col, 0, color, &right)?;
    out.queue(style::ResetColor)?;
    Ok(())
}

pub fn draw_buttons<W: Write>(
    out: &mut W,
    screen: &Screen,
    layout: &ButtonLayout,
    playfield_width: f32,
) -> io::Result<()> {
    let top = screen.buttons_top();
    clear_button_strip(out, screen)?;

    let sx = screen.cols as f32 / playfield_width;
    for (button, rect) in layout.regions() {
        let label = match button {
            Button::Left => "◀",
            Button::Right => "▶",
            Button::Fire => "FIRE",
        };
        let x0 = (rect.x * sx).floor() as u16;
        let w = ((rect.w * sx).floor() as u16).max(label.len() as u16 + 2);
        let text = format!("[{:^width$}]", label, width = w.saturating_sub(2) as usize);
        print_at(out, x0, top, C_BUTTON, &text)?;
    }
    out.queue(style::ResetColor)?;
    Ok(())
}

pub fn draw_hint<W: Write>(out: &mut W, screen: &Screen, text: &str) -> io::Result<()> {
    out.queue(cursor::MoveTo(0, screen.hint_row()))?;
    out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
    print_at(out, 1, screen.hint_row(), C_HINT, text)?;
    out.queue(style::ResetColor)?;
    Ok(())
}

/// Banner over the playfield for every state except Playing.
pub fn draw_overlay<W: Write>(out: &mut W, screen: &Screen, view: &SessionView) -> io::Result<()> {
    let lines: Vec<String> = match view.state {
        SessionState::Playing => return Ok(()),
        SessionState::Idle => vec!["SPACE  SHOOTER".into(), "S - Start".into()],
        SessionState::Paused => vec!["PAUSED".into(), "P - Resume".into()],
        SessionState::GameOver => vec![
            "GAME  OVER".into(),
            format!("Final Score: {} | Level: {}", view.score, view.level),
            "S - Play Again   R - Reset".into(),
        ],
        SessionState::LevelComplete => vec![
            "LEVEL  COMPLETE".into(),
            format!("Score: {} | Ready for Level {}?", view.score, view.level + 1),
            "N - Next Level   R - Reset".into(),
        ],
    };

    let mid = screen.playfield_top + screen.playfield_rows / 2;
    let start = mid.saturating_sub(lines.len() as u16 / 2);
    for (i, line) in lines.iter().enumerate() {
        centered(out, screen, start + i as u16, C_BANNER, line)?;
    }
    if view.new_high_score {
        centered(out, screen, start + lines.len() as u16, C_HUD_SCORE, "★ NEW HIGH SCORE ★")?;
    }
    out.queue(style::ResetColor)?;
    Ok(())
}

pub fn draw_runner_hud<W: Write>(out: &mut W, screen: &Screen, state: &RunnerState, high_score: u32) -> io::Result<()> {
    out.queue(cursor::MoveTo(0, 0))?;
    out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
    print_at(out, 1, 0, C_HUD_SCORE, &format!("Score:{:>6}  Hi:{:>6}", state.score, high_score))?;
    let speed = format!("Speed:{:.1}", state.speed);
    let col = screen.cols.saturating_sub(speed.len() as u16 + 1);
    print_at(out, col, 0, C_HUD_LEVEL, &speed)?;
    out.queue(style::ResetColor)?;
    Ok(())
}

pub fn draw_runner_overlay<W: Write>(out: &mut W, screen: &Screen, phase: RunnerPhase, score: u32) -> io::Result<()> {
    let lines: Vec<String> = match phase {
        RunnerPhase::Playing => return Ok(()),
        RunnerPhase::Idle => vec!["RUNNER".into(), "SPACE - Start".into()],
        RunnerPhase::GameOver => vec![
            "GAME  OVER".into(),
            format!("Score: {score}"),
            "SPACE - Play Again   R - Reset".into(),
        ],
    };
    let mid = screen.playfield_top + screen.playfield_rows / 2;
    let start = mid.saturating_sub(lines.len() as u16 / 2);
    for (i, line) in lines.iter().enumerate() {
        centered(out, screen, start + i as u16, C_BANNER, line)?;
    }
    out.queue(style::ResetColor)?;
    Ok(())
}

/// Blank the rows between the playfield and the hint line.
pub fn clear_button_strip<W: Write>(out: &mut W, screen: &Screen) -> io::Result<()> {
    for row in screen.buttons_top()..screen.hint_row() {
        out.queue(cursor::MoveTo(0, row))?;
        out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
    }
    Ok(())
}

// ── Guards ────────────────────────────────────────────────────────────────────

/// Raw mode, alternate screen and hidden cursor for as long as it lives.
/// Dropping it restores the terminal on every exit path, panics included.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        out.execute(terminal::EnterAlternateScreen)?;
        out.execute(cursor::Hide)?;
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = out.execute(style::ResetColor);
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Device listeners (mouse, focus changes, key-release reporting).  Held
/// while a game is in progress and released when it ends or the host
/// leaves, however that happens.
pub struct InputCapture {
    keyboard_enhanced: bool,
}

impl InputCapture {
    /// `enhance_keyboard` asks for key-release reporting; probe support
    /// once at startup, before anything else is reading events.
    pub fn acquire(enhance_keyboard: bool) -> io::Result<Self> {
        let mut out = io::stdout();
        out.execute(EnableMouseCapture)?;
        out.execute(EnableFocusChange)?;
        let keyboard_enhanced = enhance_keyboard
            && out
                .execute(PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
                ))
                .is_ok();
        debug!(keyboard_enhanced, "Input capture acquired");
        Ok(Self { keyboard_enhanced })
    }

    /// Whether key-release events will arrive.
    pub fn reports_releases(&self) -> bool {
        self.keyboard_enhanced
    }
}

impl Drop for InputCapture {
    fn drop(&mut self) {
        let mut out = io::stdout();
        if self.keyboard_enhanced {
            if let Err(err) = out.execute(PopKeyboardEnhancementFlags) {
                warn!(%err, "Failed to pop keyboard enhancement flags");
            }
        }
        let _ = out.execute(DisableFocusChange);
        let _ = out.execute(DisableMouseCapture);
        debug!("Input capture released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_rect_clips_to_grid() {
        let mut surface = TerminalSurface::new(4, 3);
        surface.fill_rect(-2, 1, 10, 10, Color::Red);
        assert_eq!(surface.cell(0, 0), Some(Color::Black));
        assert_eq!(surface.cell(3, 2), Some(Color::Red));
        assert_eq!(surface.cell(4, 2), None);
    }

    #[test]
    fn button_strip_maps_below_playfield() {
        let screen = Screen::new(80, 24);
        let (_, y) = cell_to_playfield(&screen, (800.0, 600.0), 5, screen.buttons_top()).unwrap();
        assert!(y > 600.0);
    }
}
