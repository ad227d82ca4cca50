//! Long-term archive snapshots.
//!
//! Unlike the rotating generations, archive snapshots are never deleted or
//! rewritten. A new snapshot is only justified when the save is at least
//! `min_age_sec` newer than the newest complete snapshot on disk, so the
//! archive stays sparse no matter how often the game saves.

use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};

use autosaver_clock::Clock;

use crate::fs::{Filesystem, FsError};
use crate::slot::Slot;
use crate::transfer::{copy_related, CopyError};

/// Directory label for a snapshot taken at `ts_unix_sec`.
///
/// Local time at minute resolution; lexicographic order equals chronological
/// order by construction.
pub fn archive_label(ts_unix_sec: u64) -> String {
    Local
        .timestamp_opt(ts_unix_sec as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d-%H-%M").to_string())
        .unwrap_or_else(|| ts_unix_sec.to_string())
}

/// Modification time of the newest complete snapshot for `slot`, or 0 when no
/// archive exists yet (so the next detected save archives unconditionally).
///
/// Snapshot directories are scanned in descending label order and the first
/// one that actually contains the primary save file wins; directories without
/// it are treated as incomplete and skipped.
pub fn latest_archive_mtime<F: Filesystem>(
    fs: &F,
    archive_root: &Path,
    slot: &Slot,
) -> Result<u64, FsError> {
    let slot_root = archive_root.join(slot.name());

    let mut snapshot_dirs: Vec<PathBuf> = fs
        .list_dir(&slot_root)?
        .into_iter()
        .filter(|entry| entry.is_dir)
        .map(|entry| entry.path)
        .collect();
    snapshot_dirs.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    for dir in snapshot_dirs {
        let primary = dir.join(slot.primary_file());
        if let Some(mtime) = fs.modified_unix_sec(&primary)? {
            return Ok(mtime);
        }
    }

    Ok(0)
}

/// Whether a save modified at `current_mtime` is old enough relative to the
/// newest snapshot to justify archiving.
pub fn should_archive(current_mtime: u64, latest_archive: u64, min_age_sec: u64) -> bool {
    current_mtime.saturating_sub(latest_archive) >= min_age_sec
}

/// What a snapshot write produced.
#[derive(Debug)]
pub struct ArchiveOutcome {
    pub label: String,
    pub dest: PathBuf,
    pub copied: usize,
}

/// Write a new snapshot of the slot's related files, labeled with the current
/// local time.
///
/// Two invocations in the same minute land in the same directory and
/// overwrite in place; the minimum-age gate keeps that out of reach in normal
/// operation.
pub fn copy_to_archive<F: Filesystem, C: Clock>(
    fs: &F,
    clock: &C,
    save_dir: &Path,
    archive_root: &Path,
    slot: &Slot,
) -> Result<ArchiveOutcome, CopyError> {
    let label = archive_label(clock.now_unix_sec());
    let dest = archive_root.join(slot.name()).join(&label);

    fs.create_dir_all(&dest).map_err(|source| CopyError::CreateDir {
        path: dest.clone(),
        source,
    })?;
    let copied = copy_related(fs, save_dir, slot, &dest)?;

    Ok(ArchiveOutcome { label, dest, copied })
}
