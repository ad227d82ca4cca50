//! Change detection over save-slot modification times.
//!
//! The detector owns the in-memory `last_observed` map; it has no side
//! effects beyond that map. The loop records a detection immediately, before
//! any backup work, so backup latency cannot re-trigger on the same write.

use std::collections::HashMap;
use std::path::Path;

use autosaver_fs::{Filesystem, FsError, Slot};

/// Tracks the last observed modification time per slot and decides which
/// samples count as genuinely new save events.
#[derive(Debug)]
pub struct ChangeDetector {
    last_observed: HashMap<String, u64>,
    tolerance_sec: u64,
}

impl ChangeDetector {
    /// Create a detector with the given debounce tolerance.
    pub fn new(tolerance_sec: u64) -> Self {
        Self {
            last_observed: HashMap::new(),
            tolerance_sec,
        }
    }

    /// Stat the slot's primary file. `None` means the slot has not been saved
    /// yet.
    pub fn sample<F: Filesystem>(
        fs: &F,
        save_dir: &Path,
        slot: &Slot,
    ) -> Result<Option<u64>, FsError> {
        fs.modified_unix_sec(&save_dir.join(slot.primary_file()))
    }

    /// Whether `current` is far enough past the last observation to count as
    /// a new save. Slots never observed use 0 as the baseline, so any
    /// existing save triggers.
    pub fn is_newly_modified(&self, slot: &Slot, current: u64) -> bool {
        let last = self.last_observed.get(slot.name()).copied().unwrap_or(0);
        current > last.saturating_add(self.tolerance_sec)
    }

    /// Record an observation for the slot.
    pub fn observe(&mut self, slot: &Slot, current: u64) {
        self.last_observed.insert(slot.name().to_string(), current);
    }

    /// The last observed modification time, if any.
    pub fn last_observed(&self, slot: &Slot) -> Option<u64> {
        self.last_observed.get(slot.name()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autosaver_fs::MockFilesystem;
    use std::path::PathBuf;

    const TOLERANCE: u64 = 1;

    #[test]
    fn sample_returns_primary_mtime() {
        let fs = MockFilesystem::new();
        let save_dir = PathBuf::from("/game/Saved");
        let slot = Slot::numbered(1);
        fs.add_file(save_dir.join(slot.primary_file()), 1000);

        let sampled = ChangeDetector::sample(&fs, &save_dir, &slot).expect("sample");
        assert_eq!(sampled, Some(1000));
    }

    #[test]
    fn sample_of_unsaved_slot_is_none() {
        let fs = MockFilesystem::new();
        let slot = Slot::numbered(4);

        let sampled =
            ChangeDetector::sample(&fs, Path::new("/game/Saved"), &slot).expect("sample");
        assert_eq!(sampled, None);
    }

    #[test]
    fn unobserved_slot_triggers_on_any_save() {
        let detector = ChangeDetector::new(TOLERANCE);
        let slot = Slot::numbered(1);

        assert!(detector.is_newly_modified(&slot, 1000));
    }

    #[test]
    fn delta_within_tolerance_does_not_trigger() {
        let mut detector = ChangeDetector::new(TOLERANCE);
        let slot = Slot::numbered(1);
        detector.observe(&slot, 1000);

        // Equal and +1 second are both within the debounce window.
        assert!(!detector.is_newly_modified(&slot, 1000));
        assert!(!detector.is_newly_modified(&slot, 1001));
    }

    #[test]
    fn delta_past_tolerance_triggers() {
        let mut detector = ChangeDetector::new(TOLERANCE);
        let slot = Slot::numbered(1);
        detector.observe(&slot, 1000);

        assert!(detector.is_newly_modified(&slot, 1002));
    }

    #[test]
    fn older_mtime_does_not_trigger() {
        let mut detector = ChangeDetector::new(TOLERANCE);
        let slot = Slot::numbered(1);
        detector.observe(&slot, 1000);

        assert!(!detector.is_newly_modified(&slot, 900));
    }

    #[test]
    fn observe_moves_the_baseline() {
        let mut detector = ChangeDetector::new(TOLERANCE);
        let slot = Slot::numbered(1);

        detector.observe(&slot, 1000);
        assert_eq!(detector.last_observed(&slot), Some(1000));

        detector.observe(&slot, 2000);
        assert_eq!(detector.last_observed(&slot), Some(2000));
        assert!(!detector.is_newly_modified(&slot, 2000));
    }

    #[test]
    fn slots_are_tracked_independently() {
        let mut detector = ChangeDetector::new(TOLERANCE);
        let one = Slot::numbered(1);
        let two = Slot::numbered(2);

        detector.observe(&one, 5000);

        assert!(!detector.is_newly_modified(&one, 5000));
        assert!(detector.is_newly_modified(&two, 5000));
    }
}
