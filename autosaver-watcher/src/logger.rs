//! Logging for the watcher.
//!
//! Trait-based so the loop's log output can be asserted in tests. The real
//! sink writes every line, prefixed with a local timestamp, to both stderr
//! and the log file. Event category tags (`[INIT]`, `[UPDATE]`, `[ROTATE]`,
//! `[ARCHIVE]`, `[DELETE]`, `[ERROR]`, `[CRITICAL ERROR]`) are part of the
//! message text at the call sites.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{Local, TimeZone};

/// Verbosity level for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Normal output (always shown)
    Normal,
    /// Verbose output (-v flag)
    Verbose,
    /// Debug output (-vv flag)
    Debug,
}

impl Verbosity {
    /// Create verbosity from CLI flag count.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }
}

/// Format a unix timestamp as a local wall-clock string for log messages.
pub fn local_timestamp(ts_unix_sec: u64) -> String {
    Local
        .timestamp_opt(ts_unix_sec as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts_unix_sec.to_string())
}

/// Trait for logging output.
pub trait Logger: Send + Sync {
    /// Log a message at the given verbosity level.
    fn log(&self, level: Verbosity, message: &str);

    /// Log at normal level (always visible).
    fn info(&self, message: &str) {
        self.log(Verbosity::Normal, message);
    }

    /// Log at verbose level (requires -v).
    fn verbose(&self, message: &str) {
        self.log(Verbosity::Verbose, message);
    }

    /// Log at debug level (requires -vv).
    fn debug(&self, message: &str) {
        self.log(Verbosity::Debug, message);
    }
}

/// Logger that writes timestamped lines to stderr and, when configured, the
/// log file.
pub struct TeeLogger {
    level: Verbosity,
    file: Option<Mutex<File>>,
}

impl TeeLogger {
    /// Create a logger appending to the file at `path`.
    pub fn create(path: &Path, level: Verbosity) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            level,
            file: Some(Mutex::new(file)),
        })
    }

    /// Create a logger with no file sink.
    pub fn console_only(level: Verbosity) -> Self {
        Self { level, file: None }
    }
}

impl Logger for TeeLogger {
    fn log(&self, level: Verbosity, message: &str) {
        if level > self.level {
            return;
        }
        let line = format!("{} - {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
        let _ = writeln!(std::io::stderr(), "{line}");
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{line}");
            }
        }
    }
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Verbosity,
    pub message: String,
}

/// Mock logger for testing that captures all messages.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    messages: Arc<RwLock<Vec<LogEntry>>>,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.messages.read().unwrap().clone()
    }

    /// All captured message texts.
    pub fn messages(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.message.clone()).collect()
    }

    /// Whether any message contains the given substring.
    pub fn contains(&self, substring: &str) -> bool {
        self.messages().iter().any(|m| m.contains(substring))
    }

    /// Number of messages containing the given substring.
    pub fn count_containing(&self, substring: &str) -> usize {
        self.messages().iter().filter(|m| m.contains(substring)).count()
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Verbosity, message: &str) {
        // Capture regardless of level so tests can see everything.
        self.messages.write().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

/// A no-op logger that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Verbosity, _message: &str) {}
}
