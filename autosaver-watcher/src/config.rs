//! Immutable watcher configuration.
//!
//! Built once at startup from the CLI and passed by reference everywhere;
//! nothing mutates it after construction.

use std::path::{Path, PathBuf};

use autosaver_fs::Slot;

use crate::cli::{
    Cli, ARCHIVE_DIR_NAME, DEFAULT_ARCHIVE_MIN_AGE_SEC, DEFAULT_DEBOUNCE_TOLERANCE_SEC,
    DEFAULT_ERROR_BACKOFF_SEC, DEFAULT_MAX_GENERATIONS, DEFAULT_POLL_INTERVAL_SEC,
    DEFAULT_SETTLE_DELAY_SEC, ROTATING_DIR_NAME, SAVE_DIR_NAME, STATUS_FILE_NAME,
};

/// Configuration for a watch run, fixed at startup.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory the game writes saves into.
    pub save_dir: PathBuf,

    /// Root of the rotating-generation tree.
    pub rotating_dir: PathBuf,

    /// Root of the archive-snapshot tree.
    pub archive_dir: PathBuf,

    /// Heartbeat file path.
    pub status_path: PathBuf,

    /// The fixed slot set being watched.
    pub slots: Vec<Slot>,

    /// Seconds between polls.
    pub poll_interval_sec: u64,

    /// Seconds to let the filesystem settle after rotation, before copying.
    pub settle_delay_sec: u64,

    /// Minimum mtime delta for a write to count as a new save event.
    pub debounce_tolerance_sec: u64,

    /// Minimum age of the newest snapshot before archiving again.
    pub archive_min_age_sec: u64,

    /// Rotating generations kept per slot.
    pub max_generations: u32,

    /// Backoff after an unexpected error in the loop.
    pub error_backoff_sec: u64,
}

impl WatcherConfig {
    /// Configuration with every constant at its default, rooted at `root`.
    pub fn for_root(root: &Path) -> Self {
        Self {
            save_dir: root.join(SAVE_DIR_NAME),
            rotating_dir: root.join(ROTATING_DIR_NAME),
            archive_dir: root.join(ARCHIVE_DIR_NAME),
            status_path: root.join(STATUS_FILE_NAME),
            slots: Slot::all(),
            poll_interval_sec: DEFAULT_POLL_INTERVAL_SEC,
            settle_delay_sec: DEFAULT_SETTLE_DELAY_SEC,
            debounce_tolerance_sec: DEFAULT_DEBOUNCE_TOLERANCE_SEC,
            archive_min_age_sec: DEFAULT_ARCHIVE_MIN_AGE_SEC,
            max_generations: DEFAULT_MAX_GENERATIONS,
            error_backoff_sec: DEFAULT_ERROR_BACKOFF_SEC,
        }
    }

    /// Build the run configuration from validated CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            poll_interval_sec: cli.poll_interval_sec,
            archive_min_age_sec: cli.archive_min_age_sec,
            max_generations: cli.max_generations,
            ..Self::for_root(&cli.root)
        }
    }
}
