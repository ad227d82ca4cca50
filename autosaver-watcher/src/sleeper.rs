//! Sleep abstraction for the watch loop.
//!
//! The loop has three timed waits (poll interval, post-rotation settle pause,
//! error backoff); routing them through a trait lets tests run instantly and
//! assert which pauses happened.

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Trait for sleeping between and within watch cycles.
pub trait Sleeper: Send + Sync {
    /// Sleep for the specified number of seconds.
    fn sleep_sec(&self, seconds: u64);
}

/// Real sleeper that uses `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealSleeper;

impl RealSleeper {
    pub fn new() -> Self {
        Self
    }
}

impl Sleeper for RealSleeper {
    fn sleep_sec(&self, seconds: u64) {
        std::thread::sleep(Duration::from_secs(seconds));
    }
}

/// Mock sleeper for testing - returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockSleeper;

impl MockSleeper {
    pub fn new() -> Self {
        Self
    }
}

impl Sleeper for MockSleeper {
    fn sleep_sec(&self, _seconds: u64) {}
}

/// Test sleeper that records every requested duration.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<u64>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations requested so far, in order.
    pub fn recorded(&self) -> Vec<u64> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep_sec(&self, seconds: u64) {
        self.sleeps.lock().unwrap().push(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_sleeper_returns_immediately() {
        let sleeper = MockSleeper::new();
        let start = std::time::Instant::now();
        sleeper.sleep_sec(100);
        assert!(start.elapsed().as_millis() < 10);
    }

    #[test]
    fn recording_sleeper_captures_durations() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep_sec(5);
        sleeper.sleep_sec(1);
        sleeper.sleep_sec(10);

        assert_eq!(sleeper.recorded(), vec![5, 1, 10]);
    }

    #[test]
    fn recording_sleeper_clone_shares_record() {
        let sleeper = RecordingSleeper::new();
        let clone = sleeper.clone();
        clone.sleep_sec(3);
        assert_eq!(sleeper.recorded(), vec![3]);
    }

    #[test]
    fn sleeper_trait_object() {
        let sleeper: Box<dyn Sleeper> = Box::new(MockSleeper::new());
        sleeper.sleep_sec(1);
    }
}
