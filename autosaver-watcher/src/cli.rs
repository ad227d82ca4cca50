//! CLI argument parsing for the autosaver.
//!
//! The watcher has a single mode of operation; flags only override the fixed
//! timing constants, and none of them can be changed after startup.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

/// Seconds between polls of the save directory.
pub const DEFAULT_POLL_INTERVAL_SEC: u64 = 5;

/// Seconds to let the filesystem settle after a rotation, before copying.
pub const DEFAULT_SETTLE_DELAY_SEC: u64 = 1;

/// Minimum mtime delta in seconds for a write to count as a new save event.
pub const DEFAULT_DEBOUNCE_TOLERANCE_SEC: u64 = 1;

/// Minimum age in seconds of the newest archive snapshot before a new one is
/// written (10 minutes).
pub const DEFAULT_ARCHIVE_MIN_AGE_SEC: u64 = 600;

/// Number of rotating generations kept per slot.
pub const DEFAULT_MAX_GENERATIONS: u32 = 5;

/// Seconds to back off after an unexpected error in the watch loop.
pub const DEFAULT_ERROR_BACKOFF_SEC: u64 = 10;

/// Directory of save files under the root, written by the game.
pub const SAVE_DIR_NAME: &str = "Saved";

/// Directory of rotating generations under the root.
pub const ROTATING_DIR_NAME: &str = "Rotating";

/// Directory of archive snapshots under the root.
pub const ARCHIVE_DIR_NAME: &str = "Archive";

/// Default log file name under the root.
pub const DEFAULT_LOG_FILE_NAME: &str = "autosaver.log";

/// Heartbeat file name under the root.
pub const STATUS_FILE_NAME: &str = "autosaver-status.jsonl";

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("poll-interval-sec must be at least 1, got {0}")]
    InvalidPollInterval(u64),

    #[error("archive-min-age-sec must be at least 1, got {0}")]
    InvalidArchiveMinAge(u64),

    #[error("max-generations must be at least 1, got {0}")]
    InvalidMaxGenerations(u32),
}

/// Autosaver - rotating and archival backups for save-game slots.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "autosaver")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Root directory containing the game's Saved/ folder. The Rotating/ and
    /// Archive/ trees are created next to it.
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Seconds between polls of the save directory.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SEC)]
    pub poll_interval_sec: u64,

    /// Minimum age of the newest archive snapshot before a new one is written.
    #[arg(long, default_value_t = DEFAULT_ARCHIVE_MIN_AGE_SEC)]
    pub archive_min_age_sec: u64,

    /// Number of rotating generations to keep per slot.
    #[arg(long, default_value_t = DEFAULT_MAX_GENERATIONS)]
    pub max_generations: u32,

    /// Log file path. Defaults to autosaver.log under the root.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Increase verbosity (-v verbose, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.poll_interval_sec == 0 {
            return Err(CliError::InvalidPollInterval(self.poll_interval_sec));
        }
        if self.archive_min_age_sec == 0 {
            return Err(CliError::InvalidArchiveMinAge(self.archive_min_age_sec));
        }
        if self.max_generations == 0 {
            return Err(CliError::InvalidMaxGenerations(self.max_generations));
        }
        Ok(())
    }

    /// Resolved log file path.
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.root.join(DEFAULT_LOG_FILE_NAME))
    }
}
