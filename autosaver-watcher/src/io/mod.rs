//! Machine-readable output for the watcher.

pub mod status_writer;

pub use status_writer::{StatusLine, StatusWriter, StatusWriterError};
