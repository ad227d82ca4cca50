//! Status writer for the append-only heartbeat file.
//!
//! One JSON line per watch cycle that detected at least one update, so an
//! operator can confirm the watcher is alive and see what it has done without
//! parsing the human-oriented log.

use std::path::{Path, PathBuf};

use autosaver_fs::{Filesystem, FsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from status writing.
#[derive(Debug, Error)]
pub enum StatusWriterError {
    #[error("failed to append status: {0}")]
    Append(#[source] FsError),
}

/// A single status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    /// Unix epoch seconds when this cycle completed.
    pub timestamp: u64,

    /// Watch cycle number (1-indexed).
    pub cycle: u64,

    /// Updates detected in this cycle.
    pub updates_detected: u64,

    /// Cumulative rotating backups completed so far.
    pub rotations: u64,

    /// Cumulative archive snapshots written so far.
    pub archives_written: u64,
}

impl StatusLine {
    pub fn new(
        timestamp: u64,
        cycle: u64,
        updates_detected: u64,
        rotations: u64,
        archives_written: u64,
    ) -> Self {
        Self {
            timestamp,
            cycle,
            updates_detected,
            rotations,
            archives_written,
        }
    }

    /// Serialize to a JSON line (no trailing newline).
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("StatusLine serialization should never fail")
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Writer for the append-only status file.
pub struct StatusWriter<F: Filesystem> {
    fs: F,
    path: PathBuf,
}

impl<F: Filesystem> StatusWriter<F> {
    pub fn new(fs: F, path: PathBuf) -> Self {
        Self { fs, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a status line, creating the file if needed.
    pub fn append(&self, status: &StatusLine) -> Result<(), StatusWriterError> {
        let line = format!("{}\n", status.to_json());
        self.fs
            .append_atomic(&self.path, line.as_bytes())
            .map_err(StatusWriterError::Append)
    }
}
