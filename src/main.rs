use std::io::{self, stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    style::{self, Color, Print},
    terminal, QueueableCommand,
};
use rand::thread_rng;
use tracing::{info, warn};

use arcade_shooter::config::{Difficulty, GameConfig, InputMode, ShooterPolicy};
use arcade_shooter::display;
use arcade_shooter::input::KeyHold;
use arcade_shooter::logging;
use arcade_shooter::runner::{RunnerConfig, RunnerGame, RunnerInput, RunnerPhase};
use arcade_shooter::score_store;
use arcade_shooter::session::{FrameOutcome, Session, SessionState};
use arcade_shooter::terminal::{
    clear_button_strip, draw_buttons, draw_hint, draw_hud, draw_overlay, draw_runner_hud, draw_runner_overlay,
    translate, HostCommand, InputCapture, Screen, TerminalGuard, TerminalSurface, Translated,
};

const FRAME: Duration = Duration::from_millis(16); // ≈60 FPS

/// A key is considered held while its last press/repeat event arrived within
/// this many frames.  Covers terminals that never report key releases: OS
/// key-repeat refreshes the key well before the window runs out.
const HOLD_WINDOW: u64 = 8;

#[derive(Parser, Debug)]
#[command(version, about = "Formation shooter and runner for the terminal")]
struct Args {
    /// TOML file overriding the built-in tuning.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Difficulty preselected in the menu.
    #[arg(long, value_enum)]
    difficulty: Option<Difficulty>,

    #[arg(long, value_enum)]
    input_mode: Option<InputMode>,

    /// Which enemy returns fire.
    #[arg(long, value_enum)]
    shooter: Option<ShooterPolicy>,

    /// Where the shooter high score is kept.
    #[arg(long)]
    score_file: Option<PathBuf>,

    /// Disable shields and power-ups regardless of the config file.
    #[arg(long)]
    no_extensions: bool,
}

fn build_config(args: &Args) -> anyhow::Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path).with_context(|| format!("loading config from {}", path.display()))?,
        None => GameConfig::default(),
    };
    if let Some(mode) = args.input_mode {
        config.input_mode = mode;
    }
    if let Some(policy) = args.shooter {
        config.shooter_policy = policy;
    }
    if args.no_extensions {
        config.extensions.shield_charges = 0;
        config.extensions.power_ups = false;
    }
    Ok(config)
}

fn persist(path: &Path, score: u32) {
    if let Err(err) = score_store::save(path, score) {
        warn!(%err, path = %path.display(), "Could not save high score");
    }
}

// ── Menu ──────────────────────────────────────────────────────────────────────

enum MenuResult {
    Shooter(Difficulty),
    Runner,
    Quit,
}

fn show_menu<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    high_score: u32,
    preselected: Difficulty,
) -> io::Result<MenuResult> {
    out.queue(style::SetBackgroundColor(Color::Reset))?;
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    let (width, height) = terminal::size()?;
    let cx = width / 2;
    let cy = height / 2;

    let title = "★  SPACE  SHOOTER  ★";
    out.queue(cursor::MoveTo(
        cx.saturating_sub(title.chars().count() as u16 / 2),
        cy.saturating_sub(6),
    ))?;
    out.queue(style::SetForegroundColor(Color::Cyan))?;
    out.queue(Print(title))?;

    if high_score > 0 {
        let hs_str = format!("Best Score: {}", high_score);
        out.queue(cursor::MoveTo(
            cx.saturating_sub(hs_str.chars().count() as u16 / 2),
            cy.saturating_sub(5),
        ))?;
        out.queue(style::SetForegroundColor(Color::Yellow))?;
        out.queue(Print(&hs_str))?;
    }

    out.queue(cursor::MoveTo(cx.saturating_sub(12), cy.saturating_sub(3)))?;
    out.queue(style::SetForegroundColor(Color::White))?;
    out.queue(Print("Select difficulty:"))?;

    let options: &[(&str, Difficulty, Color, &str)] = &[
        ("1", Difficulty::Easy, Color::Green, "Slow formation, rare return fire"),
        ("2", Difficulty::Medium, Color::Yellow, "Balanced challenge"),
        ("3", Difficulty::Hard, Color::Red, "Fast and relentless"),
    ];

    for (i, (key, difficulty, color, desc)) in options.iter().enumerate() {
        let row = cy.saturating_sub(1) + i as u16;
        out.queue(cursor::MoveTo(cx.saturating_sub(12), row))?;
        let marker = if *difficulty == preselected { "›" } else { " " };
        out.queue(style::SetForegroundColor(Color::DarkGrey))?;
        out.queue(Print(format!("{marker}[{}] ", key)))?;
        out.queue(style::SetForegroundColor(*color))?;
        out.queue(Print(format!("{:<8}", difficulty.label())))?;
        out.queue(style::SetForegroundColor(Color::DarkGrey))?;
        out.queue(Print(format!(" {}", desc)))?;
    }

    out.queue(cursor::MoveTo(cx.saturating_sub(12), cy + 3))?;
    out.queue(style::SetForegroundColor(Color::DarkGrey))?;
    out.queue(Print(" [R] Runner   [Enter] Start   [Q] Quit"))?;

    out.queue(cursor::MoveTo(cx.saturating_sub(12), cy + 5))?;
    out.queue(Print("← → / A D : Move   SPACE : Shoot   P : Pause"))?;

    out.queue(style::ResetColor)?;
    out.flush()?;

    // Block until the user makes a choice
    loop {
        let Ok(event) = rx.recv() else {
            return Ok(MenuResult::Quit);
        };
        if let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            modifiers,
            ..
        }) = event
        {
            match code {
                KeyCode::Char('1') => return Ok(MenuResult::Shooter(Difficulty::Easy)),
                KeyCode::Char('2') => return Ok(MenuResult::Shooter(Difficulty::Medium)),
                KeyCode::Char('3') => return Ok(MenuResult::Shooter(Difficulty::Hard)),
                KeyCode::Enter => return Ok(MenuResult::Shooter(preselected)),
                KeyCode::Char('r') | KeyCode::Char('R') => return Ok(MenuResult::Runner),
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(MenuResult::Quit);
                }
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(MenuResult::Quit),
                _ => {}
            }
        }
    }
}

// ── Shooter loop ──────────────────────────────────────────────────────────────

/// Returns the high score when the player leaves back to the menu.
///
/// Each loop iteration is one host frame: drain device events into the
/// session, run the scheduled frame if there is one (or redraw in place
/// when there is not), then paint the chrome around the playfield.
fn shooter_loop<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    config: GameConfig,
    high_score: u32,
    hold: KeyHold,
    score_path: &Path,
) -> io::Result<u32> {
    let playfield = (config.width, config.height);
    let mut session = Session::new(config, thread_rng(), high_score, hold);
    session.start();

    let (cols, rows) = terminal::size()?;
    let mut screen = Screen::new(cols, rows);
    let mut surface = TerminalSurface::new(screen.cols, screen.playfield_rows);
    let mut capture: Option<InputCapture> = None;
    let enhance_keyboard = hold == KeyHold::UntilRelease;

    out.queue(terminal::Clear(terminal::ClearType::All))?;

    loop {
        let frame_start = Instant::now();

        // Listeners follow the session: attached while a game is in
        // progress, released as soon as it is not.
        match (session.wants_input(), capture.is_some()) {
            (true, false) => capture = Some(InputCapture::acquire(enhance_keyboard)?),
            (false, true) => capture = None,
            _ => {}
        }

        while let Ok(event) = rx.try_recv() {
            match translate(&event, &screen, playfield) {
                Translated::Device(device) => session.handle_event(device),
                Translated::Command(HostCommand::Quit) => return Ok(session.high_score()),
                Translated::Command(HostCommand::Start) => session.start(),
                Translated::Command(HostCommand::TogglePause) => session.toggle_pause(),
                Translated::Command(HostCommand::NextLevel) => session.next_level(),
                Translated::Command(HostCommand::Reset) => session.reset(),
                Translated::FocusLost => session.focus_lost(),
                Translated::Resize(cols, rows) => {
                    screen = Screen::new(cols, rows);
                    surface.resize(screen.cols, screen.playfield_rows);
                    out.queue(style::SetBackgroundColor(Color::Reset))?;
                    out.queue(terminal::Clear(terminal::ClearType::All))?;
                }
                Translated::Ignored => {}
            }
        }

        match session.pending_frame() {
            Some(request) => {
                if let FrameOutcome::Ended { state, .. } = session.run_frame(request, &mut surface) {
                    let view = session.view();
                    info!(?state, score = view.score, level = view.level, "Game finished");
                    if view.new_high_score {
                        persist(score_path, session.high_score());
                    }
                }
            }
            None => {
                session.redraw(&mut surface);
            }
        }

        surface.present(out, screen.playfield_top)?;
        let view = session.view();
        draw_hud(out, &screen, &view)?;
        draw_buttons(out, &screen, session.button_layout(), playfield.0)?;
        let hint = match view.state {
            SessionState::Playing => "← → / A D : Move   SPACE : Shoot   P : Pause   Q : Menu",
            SessionState::Paused => "P : Resume   R : Reset   Q : Menu",
            _ => "S : Start   N : Next level   R : Reset   Q : Menu",
        };
        draw_hint(out, &screen, hint)?;
        draw_overlay(out, &screen, &view)?;
        out.flush()?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            thread::sleep(FRAME - elapsed);
        }
    }
}

// ── Runner loop ───────────────────────────────────────────────────────────────

/// Returns `true` → quit program,  `false` → back to menu.
fn runner_loop<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    config: RunnerConfig,
    score_path: &Path,
) -> io::Result<bool> {
    let mut game = RunnerGame::new(config, score_store::load(score_path));
    let mut rng = thread_rng();

    let (cols, rows) = terminal::size()?;
    let mut screen = Screen::new(cols, rows);
    let mut surface = TerminalSurface::new(screen.cols, screen.playfield_rows);
    let mut duck_seen: Option<u64> = None;
    let mut frame: u64 = 0;

    out.queue(terminal::Clear(terminal::ClearType::All))?;

    loop {
        let frame_start = Instant::now();
        frame += 1;
        let mut jump = false;

        while let Ok(event) = rx.try_recv() {
            match event {
                Event::Key(KeyEvent {
                    code, kind, modifiers, ..
                }) => {
                    if kind == KeyEventKind::Release {
                        if code == KeyCode::Down {
                            duck_seen = None;
                        }
                        continue;
                    }
                    match code {
                        KeyCode::Char(' ') | KeyCode::Up => {
                            if game.phase() == RunnerPhase::Playing {
                                jump = true;
                            } else {
                                game.start();
                            }
                        }
                        KeyCode::Down => duck_seen = Some(frame),
                        KeyCode::Char('r') | KeyCode::Char('R') => game.reset(),
                        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(false),
                        _ => {}
                    }
                }
                Event::Resize(cols, rows) => {
                    screen = Screen::new(cols, rows);
                    surface.resize(screen.cols, screen.playfield_rows);
                    out.queue(style::SetBackgroundColor(Color::Reset))?;
                    out.queue(terminal::Clear(terminal::ClearType::All))?;
                }
                _ => {}
            }
        }

        let duck = duck_seen.is_some_and(|seen| frame.saturating_sub(seen) <= HOLD_WINDOW);
        let best = game.high_score();
        game.frame(RunnerInput { jump, duck }, &mut rng);
        if game.high_score() > best {
            persist(score_path, game.high_score());
        }

        display::render_runner(&mut surface, game.state());
        surface.present(out, screen.playfield_top)?;
        draw_runner_hud(out, &screen, game.state(), game.high_score())?;
        clear_button_strip(out, &screen)?;
        draw_hint(out, &screen, "SPACE / ↑ : Jump   ↓ : Duck   R : Reset   Q : Menu")?;
        draw_runner_overlay(out, &screen, game.phase(), game.state().score)?;
        out.flush()?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            thread::sleep(FRAME - elapsed);
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let logs = logging::init().context("installing tracing subscriber")?;
    let config = build_config(&args)?;

    let result = {
        let _terminal = TerminalGuard::acquire().context("preparing terminal")?;

        // Probe before the reader thread starts consuming stdin.
        let hold = if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            KeyHold::UntilRelease
        } else {
            KeyHold::Window(HOLD_WINDOW)
        };
        info!(?hold, "Terminal ready");

        // Dedicate a thread exclusively to blocking event reads, sending them
        // through a channel so the game loop never has to block on I/O.
        let (tx, rx) = mpsc::channel::<Event>();
        thread::spawn(move || {
            while let Ok(ev) = event::read() {
                if tx.send(ev).is_err() {
                    break; // receiver dropped → program exiting
                }
            }
        });

        let mut out = BufWriter::new(stdout());
        run(&mut out, &rx, &args, config, hold)
    };

    // The screen is restored by now; hand the buffered log over.
    let _ = io::stderr().write_all(&logs.take());
    result
}

fn run<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    args: &Args,
    config: GameConfig,
    hold: KeyHold,
) -> anyhow::Result<()> {
    let score_path = args
        .score_file
        .clone()
        .unwrap_or_else(|| score_store::default_path(score_store::SHOOTER_FILE));
    let runner_path = score_store::default_path(score_store::RUNNER_FILE);
    let mut high_score = score_store::load(&score_path);
    let preselected = args.difficulty.unwrap_or(Difficulty::Medium);

    loop {
        match show_menu(out, rx, high_score, preselected)? {
            MenuResult::Quit => break,
            MenuResult::Shooter(difficulty) => {
                let mut level_config = config.clone();
                difficulty.apply(&mut level_config);
                info!(difficulty = difficulty.label(), "Starting shooter");
                high_score = shooter_loop(out, rx, level_config, high_score, hold, &score_path)
                    .context("shooter loop")?;
            }
            MenuResult::Runner => {
                if runner_loop(out, rx, config.runner.clone(), &runner_path).context("runner loop")? {
                    break;
                }
            }
        }
    }
    Ok(())
}
