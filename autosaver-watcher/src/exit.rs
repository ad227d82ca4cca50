//! Exit codes for the autosaver binary.
//!
//! Following Unix conventions for exit codes.

use crate::watcher::WatchError;

/// Exit code constants.
pub mod codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments.
    pub const INVALID_ARGS: i32 = 1;
    /// IO error.
    pub const IO_ERROR: i32 = 2;
    /// Watch loop error.
    pub const WATCH_ERROR: i32 = 3;
}

/// Map a WatchError to an exit code.
pub fn exit_code(error: &WatchError) -> i32 {
    match error {
        WatchError::Filesystem(_) => codes::IO_ERROR,
        WatchError::Status(_) => codes::WATCH_ERROR,
    }
}
