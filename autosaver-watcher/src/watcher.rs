//! The watch loop.
//!
//! One cycle per poll interval, all slots processed sequentially. A failure
//! while backing up one slot is logged and never aborts the others; an error
//! escaping the per-slot handling is logged with context and followed by a
//! longer backoff instead of terminating the process.

use thiserror::Error;

use autosaver_clock::Clock;
use autosaver_fs::{
    copy_to_archive, copy_to_rotating, latest_archive_mtime, rotate_slot, should_archive,
    Filesystem, FsError, Slot,
};

use crate::config::WatcherConfig;
use crate::detector::ChangeDetector;
use crate::io::{StatusLine, StatusWriter, StatusWriterError};
use crate::logger::{local_timestamp, Logger};
use crate::signal::ShutdownCheck;
use crate::sleeper::Sleeper;

/// Errors that escape per-slot handling.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("filesystem error: {0}")]
    Filesystem(#[from] FsError),

    #[error("status error: {0}")]
    Status(#[from] StatusWriterError),
}

/// Totals for a whole watch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchResult {
    /// Completed watch cycles.
    pub cycles: u64,

    /// Save events detected.
    pub updates_detected: u64,

    /// Rotating backups completed (rotation plus copy).
    pub rotations: u64,

    /// Archive snapshots written.
    pub archives_written: u64,

    /// Errors confined to a single slot's backup work.
    pub slot_errors: u64,

    /// Errors that escaped per-slot handling.
    pub cycle_errors: u64,
}

/// Totals for one cycle.
#[derive(Debug, Default, Clone, Copy)]
struct CycleStats {
    updates: u64,
    rotations: u64,
    archives: u64,
    slot_errors: u64,
}

/// What processing one detected update did.
#[derive(Debug, Default)]
struct SlotOutcome {
    rotated: bool,
    archived: bool,
    errors: u64,
}

/// Run the watch loop until shutdown is requested.
///
/// Samples every slot once at startup to seed the detector, then cycles:
/// sleep, detect, back up. Shutdown is observed at the top of each cycle, so
/// termination takes effect at the next wake point.
pub fn execute_watch<F, C, S, H, L>(
    config: &WatcherConfig,
    fs: &F,
    clock: &C,
    sleeper: &S,
    shutdown: &H,
    logger: &L,
) -> Result<WatchResult, WatchError>
where
    F: Filesystem + Clone,
    C: Clock,
    S: Sleeper,
    H: ShutdownCheck,
    L: Logger,
{
    logger.info(&format!(
        "[INIT] watching {} slots under {}",
        config.slots.len(),
        config.save_dir.display()
    ));

    let mut detector = ChangeDetector::new(config.debounce_tolerance_sec);
    for slot in &config.slots {
        match ChangeDetector::sample(fs, &config.save_dir, slot)? {
            Some(mtime) => {
                detector.observe(slot, mtime);
                logger.info(&format!(
                    "[INIT] {} last modified at {}",
                    slot.name(),
                    local_timestamp(mtime)
                ));
            }
            None => logger.verbose(&format!("[INIT] {} has no save yet", slot.name())),
        }
    }

    let status_writer = StatusWriter::new(fs.clone(), config.status_path.clone());
    let mut result = WatchResult::default();

    loop {
        if shutdown.should_stop() {
            break;
        }

        sleeper.sleep_sec(config.poll_interval_sec);

        let cycle = result.cycles + 1;
        match run_cycle(
            config,
            fs,
            clock,
            sleeper,
            logger,
            &mut detector,
            &status_writer,
            cycle,
            result,
        ) {
            Ok(stats) => {
                result.cycles = cycle;
                result.updates_detected += stats.updates;
                result.rotations += stats.rotations;
                result.archives_written += stats.archives;
                result.slot_errors += stats.slot_errors;
            }
            Err(err) => {
                result.cycles = cycle;
                result.cycle_errors += 1;
                logger.info(&format!(
                    "[CRITICAL ERROR] unexpected error in watch cycle {cycle}: {err}"
                ));
                sleeper.sleep_sec(config.error_backoff_sec);
            }
        }
    }

    logger.info("shutting down");
    Ok(result)
}

/// Process every slot once.
///
/// All backup failures are confined to their slot here; only errors from
/// cycle-level work (the status heartbeat) propagate to the caller.
#[allow(clippy::too_many_arguments)]
fn run_cycle<F, C, S, L>(
    config: &WatcherConfig,
    fs: &F,
    clock: &C,
    sleeper: &S,
    logger: &L,
    detector: &mut ChangeDetector,
    status_writer: &StatusWriter<F>,
    cycle: u64,
    completed: WatchResult,
) -> Result<CycleStats, WatchError>
where
    F: Filesystem,
    C: Clock,
    S: Sleeper,
    L: Logger,
{
    let mut stats = CycleStats::default();

    for slot in &config.slots {
        let current = match ChangeDetector::sample(fs, &config.save_dir, slot) {
            Ok(Some(mtime)) => mtime,
            Ok(None) => continue,
            Err(err) => {
                logger.info(&format!("[ERROR] failed to stat {}: {err}", slot.name()));
                stats.slot_errors += 1;
                continue;
            }
        };

        if !detector.is_newly_modified(slot, current) {
            continue;
        }

        logger.info(&format!(
            "[UPDATE] detected change in {}, starting backup",
            slot.name()
        ));
        // Record before any backup work so a slow backup cannot re-trigger
        // on the same write next cycle.
        detector.observe(slot, current);
        stats.updates += 1;

        let outcome = process_slot(config, fs, clock, sleeper, logger, slot, current);
        stats.rotations += u64::from(outcome.rotated);
        stats.archives += u64::from(outcome.archived);
        stats.slot_errors += outcome.errors;
    }

    if stats.updates > 0 {
        let status = StatusLine::new(
            clock.now_unix_sec(),
            cycle,
            stats.updates,
            completed.rotations + stats.rotations,
            completed.archives_written + stats.archives,
        );
        status_writer.append(&status)?;
    }

    Ok(stats)
}

/// Back up one slot whose save was just detected as modified.
///
/// Rotation failure skips everything else for the slot: no generation
/// numbering change is committed and no copy is made, which is what keeps the
/// ordinals contiguous. A copy failure is reported but does not block the
/// archive check.
fn process_slot<F, C, S, L>(
    config: &WatcherConfig,
    fs: &F,
    clock: &C,
    sleeper: &S,
    logger: &L,
    slot: &Slot,
    current_mtime: u64,
) -> SlotOutcome
where
    F: Filesystem,
    C: Clock,
    S: Sleeper,
    L: Logger,
{
    let mut outcome = SlotOutcome::default();

    let rotation = match rotate_slot(fs, &config.rotating_dir, slot, config.max_generations) {
        Ok(rotation) => rotation,
        Err(err) => {
            logger.info(&format!("[ERROR] rotation failed for {}: {err}", slot.name()));
            logger.info(&format!(
                "backup process for {} skipped due to rotation failure",
                slot.name()
            ));
            outcome.errors += 1;
            return outcome;
        }
    };

    if let Some(evicted) = &rotation.evicted {
        logger.info(&format!("[DELETE] removed oldest generation {}", evicted.display()));
    }

    // Let the filesystem finish flushing the source write before copying.
    sleeper.sleep_sec(config.settle_delay_sec);

    match copy_to_rotating(fs, &config.save_dir, &config.rotating_dir, slot) {
        Ok(copied) => {
            outcome.rotated = true;
            logger.info(&format!(
                "[ROTATE] copied new save of {} ({copied} files) to {}/1",
                slot.name(),
                config.rotating_dir.join(slot.name()).display()
            ));
        }
        Err(err) => {
            logger.info(&format!(
                "[ERROR] failed to copy {} to rotating tree: {err}",
                slot.name()
            ));
            outcome.errors += 1;
        }
    }

    match latest_archive_mtime(fs, &config.archive_dir, slot) {
        Ok(latest) if should_archive(current_mtime, latest, config.archive_min_age_sec) => {
            match copy_to_archive(fs, clock, &config.save_dir, &config.archive_dir, slot) {
                Ok(archive) => {
                    outcome.archived = true;
                    logger.info(&format!(
                        "[ARCHIVE] copied snapshot of {} to {}",
                        slot.name(),
                        archive.dest.display()
                    ));
                }
                Err(err) => {
                    logger.info(&format!(
                        "[ERROR] failed to copy {} to archive: {err}",
                        slot.name()
                    ));
                    outcome.errors += 1;
                }
            }
        }
        Ok(_) => {
            logger.verbose(&format!(
                "archive for {} is still fresh, skipping snapshot",
                slot.name()
            ));
        }
        Err(err) => {
            logger.info(&format!(
                "[ERROR] failed to scan archive for {}: {err}",
                slot.name()
            ));
            outcome.errors += 1;
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MockLogger;
    use crate::signal::{AlwaysShutdown, CountingShutdown};
    use autosaver_clock::FixedClock;
    use autosaver_fs::MockFilesystem;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Sleeper that runs one scripted action per poll-length sleep, letting
    /// tests mutate the mock filesystem "between" cycles. Settle and backoff
    /// sleeps pass through untouched. All requested durations are recorded.
    struct ScriptedSleeper {
        poll_sec: u64,
        actions: Mutex<VecDeque<Box<dyn FnMut() + Send>>>,
        recorded: Mutex<Vec<u64>>,
    }

    impl ScriptedSleeper {
        fn new(poll_sec: u64) -> Self {
            Self {
                poll_sec,
                actions: Mutex::new(VecDeque::new()),
                recorded: Mutex::new(Vec::new()),
            }
        }

        fn push(&self, action: impl FnMut() + Send + 'static) {
            self.actions.lock().unwrap().push_back(Box::new(action));
        }

        fn recorded(&self) -> Vec<u64> {
            self.recorded.lock().unwrap().clone()
        }
    }

    impl Sleeper for ScriptedSleeper {
        fn sleep_sec(&self, seconds: u64) {
            self.recorded.lock().unwrap().push(seconds);
            if seconds == self.poll_sec {
                if let Some(mut action) = self.actions.lock().unwrap().pop_front() {
                    action();
                }
            }
        }
    }

    fn test_config() -> WatcherConfig {
        WatcherConfig::for_root(Path::new("/game"))
    }

    fn primary_path(config: &WatcherConfig, slot: &Slot) -> PathBuf {
        config.save_dir.join(slot.primary_file())
    }

    #[test]
    fn immediate_shutdown_runs_no_cycles() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let clock = FixedClock::new(1_700_000_000);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();

        let result = execute_watch(&config, &fs, &clock, &sleeper, &AlwaysShutdown, &logger)
            .expect("watch");

        assert_eq!(result, WatchResult::default());
        assert!(logger.contains("[INIT] watching 5 slots"));
        assert!(logger.contains("shutting down"));
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn startup_primes_existing_saves() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let slot = Slot::numbered(2);
        fs.add_file(primary_path(&config, &slot), 1_700_000_000);
        let clock = FixedClock::new(1_700_000_000);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();

        execute_watch(&config, &fs, &clock, &sleeper, &AlwaysShutdown, &logger).expect("watch");

        assert!(logger.contains("[INIT] SaveSlot_2 last modified at"));
    }

    #[test]
    fn unmodified_slots_produce_no_backups() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let slot = Slot::numbered(1);
        fs.add_file(primary_path(&config, &slot), 1_700_000_000);
        let clock = FixedClock::new(1_700_000_000);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();
        let shutdown = CountingShutdown::new(2);

        let result = execute_watch(&config, &fs, &clock, &sleeper, &shutdown, &logger)
            .expect("watch");

        assert_eq!(result.cycles, 2);
        assert_eq!(result.updates_detected, 0);
        assert!(!fs.exists(&config.rotating_dir.join("SaveSlot_1")));
        assert!(!fs.exists(&config.status_path));
        assert!(!logger.contains("[UPDATE]"));
    }

    #[test]
    fn detection_rotates_and_archives() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let slot = Slot::numbered(1);
        let clock = FixedClock::new(1_700_000_900);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();
        let shutdown = CountingShutdown::new(1);

        // The save appears while the watcher sleeps.
        let save = primary_path(&config, &slot);
        let fs_action = fs.clone();
        sleeper.push(move || fs_action.add_file(&save, 1_700_000_900));

        let result = execute_watch(&config, &fs, &clock, &sleeper, &shutdown, &logger)
            .expect("watch");

        assert_eq!(result.updates_detected, 1);
        assert_eq!(result.rotations, 1);
        assert_eq!(result.archives_written, 1);
        assert_eq!(result.slot_errors, 0);

        let gen1 = config.rotating_dir.join("SaveSlot_1").join("1");
        assert_eq!(fs.file_mtime(&gen1.join(slot.primary_file())), Some(1_700_000_900));
        assert!(logger.contains("[UPDATE] detected change in SaveSlot_1"));
        assert!(logger.contains("[ROTATE]"));
        assert!(logger.contains("[ARCHIVE]"));

        // One status line for the cycle that saw the update.
        let status = fs.file_data(&config.status_path).expect("status file");
        assert_eq!(String::from_utf8(status).unwrap().lines().count(), 1);
    }

    #[test]
    fn settle_pause_runs_between_rotation_and_copy() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let slot = Slot::numbered(1);
        let clock = FixedClock::new(1_700_000_900);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();
        let shutdown = CountingShutdown::new(1);

        let save = primary_path(&config, &slot);
        let fs_action = fs.clone();
        sleeper.push(move || fs_action.add_file(&save, 1_700_000_900));

        execute_watch(&config, &fs, &clock, &sleeper, &shutdown, &logger).expect("watch");

        assert_eq!(
            sleeper.recorded(),
            vec![config.poll_interval_sec, config.settle_delay_sec]
        );
    }

    #[test]
    fn debounce_suppresses_close_writes() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let slot = Slot::numbered(1);
        let save = primary_path(&config, &slot);
        fs.add_file(&save, 1_700_000_000);
        let clock = FixedClock::new(1_700_000_000);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();
        let shutdown = CountingShutdown::new(1);

        // One second past the primed baseline: within tolerance.
        let fs_action = fs.clone();
        let save_action = save.clone();
        sleeper.push(move || fs_action.touch(&save_action, 1_700_000_001));

        let result = execute_watch(&config, &fs, &clock, &sleeper, &shutdown, &logger)
            .expect("watch");

        assert_eq!(result.updates_detected, 0);
        assert!(!fs.exists(&config.rotating_dir.join("SaveSlot_1")));
    }

    #[test]
    fn rotation_failure_skips_backup_for_the_slot() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let slot = Slot::numbered(1);
        let clock = FixedClock::new(1_700_000_900);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();
        let shutdown = CountingShutdown::new(1);

        let save = primary_path(&config, &slot);
        let stuck = config
            .rotating_dir
            .join("SaveSlot_1")
            .join("5")
            .join(slot.primary_file());
        let fs_action = fs.clone();
        sleeper.push(move || {
            fs_action.add_file(&save, 1_700_000_900);
            fs_action.add_file(&stuck, 1);
            fs_action.inject_remove_failure(&stuck);
        });

        let result = execute_watch(&config, &fs, &clock, &sleeper, &shutdown, &logger)
            .expect("watch");

        assert_eq!(result.updates_detected, 1);
        assert_eq!(result.rotations, 0);
        assert_eq!(result.archives_written, 0);
        assert_eq!(result.slot_errors, 1);
        assert!(logger.contains("[ERROR] rotation failed for SaveSlot_1"));
        assert!(logger.contains("backup process for SaveSlot_1 skipped"));
        assert!(!fs.exists(&config.rotating_dir.join("SaveSlot_1").join("1")));
        assert!(!fs.exists(&config.archive_dir.join("SaveSlot_1")));
    }

    #[test]
    fn copy_failure_is_reported_but_cycle_continues() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let slot = Slot::numbered(1);
        let clock = FixedClock::new(1_700_000_900);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();
        let shutdown = CountingShutdown::new(1);

        let save_dir = config.save_dir.clone();
        let slot_action = slot.clone();
        let fs_action = fs.clone();
        sleeper.push(move || {
            for name in slot_action.related_files() {
                fs_action.add_file(save_dir.join(name), 1_700_000_900);
            }
            // Second name in the set fails; the primary copies fine.
            fs_action.inject_copy_failure(save_dir.join("SaveSlot_1_backup.sav"));
        });

        let result = execute_watch(&config, &fs, &clock, &sleeper, &shutdown, &logger)
            .expect("watch");

        assert_eq!(result.updates_detected, 1);
        assert_eq!(result.rotations, 0);
        // The rotating copy and the archive copy both hit the poisoned file.
        assert_eq!(result.slot_errors, 2);
        assert_eq!(logger.count_containing("[ERROR]"), 2);

        // Partial copy left in place, no rollback.
        let gen1 = config.rotating_dir.join("SaveSlot_1").join("1");
        assert!(fs.exists(&gen1.join("SaveSlot_1.sav")));
        assert!(!fs.exists(&gen1.join("SaveSlot_1_backup.sav")));
    }

    #[test]
    fn status_failure_is_critical_and_backs_off() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let slot = Slot::numbered(1);
        let clock = FixedClock::new(1_700_000_900);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();
        let shutdown = CountingShutdown::new(1);

        fs.inject_append_failure(&config.status_path);
        let save = primary_path(&config, &slot);
        let fs_action = fs.clone();
        sleeper.push(move || fs_action.add_file(&save, 1_700_000_900));

        let result = execute_watch(&config, &fs, &clock, &sleeper, &shutdown, &logger)
            .expect("watch");

        assert_eq!(result.cycle_errors, 1);
        assert!(logger.contains("[CRITICAL ERROR]"));
        // poll, settle, then the error backoff.
        assert_eq!(
            sleeper.recorded(),
            vec![
                config.poll_interval_sec,
                config.settle_delay_sec,
                config.error_backoff_sec
            ]
        );
        // The loop kept going; the backup work itself succeeded.
        let gen1 = config.rotating_dir.join("SaveSlot_1").join("1");
        assert!(fs.exists(&gen1.join(slot.primary_file())));
    }

    #[test]
    fn error_in_one_slot_does_not_block_others() {
        let config = test_config();
        let fs = MockFilesystem::new();
        let one = Slot::numbered(1);
        let two = Slot::numbered(2);
        let clock = FixedClock::new(1_700_000_900);
        let sleeper = ScriptedSleeper::new(config.poll_interval_sec);
        let logger = MockLogger::new();
        let shutdown = CountingShutdown::new(1);

        let save_one = primary_path(&config, &one);
        let save_two = primary_path(&config, &two);
        let stuck = config
            .rotating_dir
            .join("SaveSlot_1")
            .join("5")
            .join(one.primary_file());
        let fs_action = fs.clone();
        sleeper.push(move || {
            fs_action.add_file(&save_one, 1_700_000_900);
            fs_action.add_file(&save_two, 1_700_000_900);
            // Slot 1's rotation will fail; slot 2 must still back up.
            fs_action.add_file(&stuck, 1);
            fs_action.inject_remove_failure(&stuck);
        });

        let result = execute_watch(&config, &fs, &clock, &sleeper, &shutdown, &logger)
            .expect("watch");

        assert_eq!(result.updates_detected, 2);
        assert_eq!(result.rotations, 1);
        assert_eq!(result.slot_errors, 1);
        let gen1 = config.rotating_dir.join("SaveSlot_2").join("1");
        assert!(fs.exists(&gen1.join(two.primary_file())));
    }
}
