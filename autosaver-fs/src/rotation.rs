//! Generation rotation for the bounded backup history.
//!
//! Each slot keeps up to `max_generations` numbered directories under the
//! rotating root, ordinal 1 newest. A rotation evicts the oldest ordinal,
//! shifts every remaining ordinal up by one (strictly descending so no
//! neighbor is overwritten before it moves), and leaves ordinal 1 vacant for
//! the caller to populate.
//!
//! Invariant: ordinals present are contiguous from 1 with no gaps. Any failure
//! mid-rotation aborts before committing a numbering change that would break
//! contiguity, so the whole backup cycle for the slot is skipped instead.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::delete::{delete_tree, DeleteError};
use crate::fs::{Filesystem, FsError};
use crate::slot::Slot;
use crate::transfer::{copy_related, CopyError};

/// Errors from rotating a slot's generations.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("failed to create {}: {source}", .path.display())]
    CreateRoot { path: PathBuf, source: FsError },

    #[error("generation {} still present after delete attempt: {source}", .path.display())]
    Evict { path: PathBuf, source: DeleteError },

    #[error("failed to shift {} to {}: {source}", .from.display(), .to.display())]
    Shift {
        from: PathBuf,
        to: PathBuf,
        source: FsError,
    },
}

/// What a successful rotation did.
#[derive(Debug, Default)]
pub struct RotationOutcome {
    /// Path of the evicted oldest generation, if one existed.
    pub evicted: Option<PathBuf>,

    /// Number of generations shifted up by one ordinal.
    pub shifted: usize,
}

/// Directory of a numbered generation for a slot.
pub fn generation_dir(rotating_root: &Path, slot: &Slot, ordinal: u32) -> PathBuf {
    rotating_root.join(slot.name()).join(ordinal.to_string())
}

/// Rotate a slot's generations, leaving ordinal 1 vacant.
///
/// If the oldest generation cannot be deleted and is still present, the
/// rotation aborts with no numbering change committed.
pub fn rotate_slot<F: Filesystem>(
    fs: &F,
    rotating_root: &Path,
    slot: &Slot,
    max_generations: u32,
) -> Result<RotationOutcome, RotationError> {
    let slot_root = rotating_root.join(slot.name());
    fs.create_dir_all(&slot_root)
        .map_err(|source| RotationError::CreateRoot {
            path: slot_root.clone(),
            source,
        })?;

    let mut outcome = RotationOutcome::default();

    let oldest = slot_root.join(max_generations.to_string());
    if fs.exists(&oldest) {
        match delete_tree(fs, &oldest) {
            Ok(()) => outcome.evicted = Some(oldest),
            Err(source) => {
                // The delete may have failed after the tree was already gone;
                // only a directory that is still present blocks the rotation.
                if fs.exists(&oldest) {
                    return Err(RotationError::Evict { path: oldest, source });
                }
                outcome.evicted = Some(oldest);
            }
        }
    }

    for ordinal in (1..max_generations).rev() {
        let from = slot_root.join(ordinal.to_string());
        let to = slot_root.join((ordinal + 1).to_string());
        if !fs.exists(&from) {
            continue;
        }
        fs.rename(&from, &to).map_err(|source| RotationError::Shift {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        outcome.shifted += 1;
    }

    Ok(outcome)
}

/// Copy the slot's current save into the vacant generation 1.
///
/// Failures here are reported to the caller but never abort the cycle; the
/// rotation has already committed and the tree stays contiguous either way.
pub fn copy_to_rotating<F: Filesystem>(
    fs: &F,
    save_dir: &Path,
    rotating_root: &Path,
    slot: &Slot,
) -> Result<usize, CopyError> {
    let dest = generation_dir(rotating_root, slot, 1);
    fs.create_dir_all(&dest).map_err(|source| CopyError::CreateDir {
        path: dest.clone(),
        source,
    })?;
    copy_related(fs, save_dir, slot, &dest)
}
