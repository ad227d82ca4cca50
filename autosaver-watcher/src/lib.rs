//! Autosaver watcher daemon.
//!
//! Polls a fixed set of save slots for modification and maintains two backup
//! tiers: a bounded rotating history and a sparse timestamped archive. The
//! filesystem work lives in `autosaver-fs`; this crate owns the CLI, the
//! change detector, the watch loop, and the logging/signal/sleep plumbing
//! around it.

pub mod cli;
pub mod config;
pub mod detector;
pub mod exit;
pub mod io;
pub mod logger;
pub mod signal;
pub mod sleeper;
pub mod watcher;

pub use cli::{Cli, CliError};
pub use config::WatcherConfig;
pub use detector::ChangeDetector;
pub use io::{StatusLine, StatusWriter, StatusWriterError};
pub use logger::{local_timestamp, Logger, MockLogger, NullLogger, TeeLogger, Verbosity};
pub use signal::{AlwaysShutdown, CountingShutdown, NeverShutdown, ShutdownCheck, ShutdownFlag};
pub use sleeper::{MockSleeper, RealSleeper, RecordingSleeper, Sleeper};
pub use watcher::{execute_watch, WatchError, WatchResult};
