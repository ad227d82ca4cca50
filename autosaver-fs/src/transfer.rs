//! File transfer primitive.
//!
//! Copies a slot's related file set into a destination directory. The game
//! does not always write all four names (a fresh save has no backup pair yet),
//! so missing sources are skipped rather than treated as errors.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fs::{Filesystem, FsError};
use crate::slot::Slot;

/// Errors from copying a related file set.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("failed to create {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: FsError },

    #[error("failed to copy {} to {}: {source}", .src.display(), .dest.display())]
    Copy {
        src: PathBuf,
        dest: PathBuf,
        source: FsError,
    },
}

/// Copy the slot's related files from `save_dir` into `dest`.
///
/// Sources that do not exist are skipped. A failed copy aborts the remaining
/// copies; files already copied stay in place. Returns the number of files
/// copied.
pub fn copy_related<F: Filesystem>(
    fs: &F,
    save_dir: &Path,
    slot: &Slot,
    dest: &Path,
) -> Result<usize, CopyError> {
    let mut copied = 0;

    for name in slot.related_files() {
        let src = save_dir.join(&name);
        if !fs.exists(&src) {
            continue;
        }
        let target = dest.join(&name);
        fs.copy_preserving(&src, &target)
            .map_err(|source| CopyError::Copy {
                src: src.clone(),
                dest: target.clone(),
                source,
            })?;
        copied += 1;
    }

    Ok(copied)
}
