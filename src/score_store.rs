//! High score persistence: one decimal number in a dotfile.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::GameResult;

pub const SHOOTER_FILE: &str = ".arcade_shooter_score";
pub const RUNNER_FILE: &str = ".arcade_runner_score";

/// `$HOME/<file_name>`, or the working directory when `HOME` is unset.
pub fn default_path(file_name: &str) -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(file_name)
}

/// A missing or unreadable file counts as no high score yet.
pub fn load(path: &Path) -> u32 {
    match fs::read_to_string(path) {
        Ok(text) => text.trim().parse().unwrap_or_else(|_| {
            warn!(path = %path.display(), "Ignoring corrupt high score file");
            0
        }),
        Err(err) => {
            debug!(path = %path.display(), %err, "No stored high score");
            0
        }
    }
}

pub fn save(path: &Path, score: u32) -> GameResult<()> {
    fs::write(path, score.to_string())?;
    debug!(path = %path.display(), score, "Saved high score");
    Ok(())
}
