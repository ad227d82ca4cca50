//! Resilient delete primitive.
//!
//! Recursively removes a directory tree. Save files copied out of some game
//! installs carry the read-only attribute, which blocks removal on platforms
//! where unlinking honors it; a permission-denied removal is retried exactly
//! once after clearing the attribute on the failing entry. Every other error
//! aborts the whole deletion, leaving the remaining entries untouched.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fs::{Filesystem, FsError};

/// Errors from deleting a directory tree.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("failed to list {}: {source}", .path.display())]
    List { path: PathBuf, source: FsError },

    #[error("failed to remove {}: {source}", .path.display())]
    Remove { path: PathBuf, source: FsError },
}

/// Recursively remove the directory tree rooted at `path`.
///
/// The caller must not assume the tree is gone when this returns an error.
pub fn delete_tree<F: Filesystem>(fs: &F, path: &Path) -> Result<(), DeleteError> {
    let entries = fs.list_dir(path).map_err(|source| DeleteError::List {
        path: path.to_path_buf(),
        source,
    })?;

    for entry in entries {
        if entry.is_dir {
            delete_tree(fs, &entry.path)?;
        } else {
            remove_entry(fs, &entry.path, false)?;
        }
    }

    remove_entry(fs, path, true)
}

fn remove_entry<F: Filesystem>(fs: &F, path: &Path, is_dir: bool) -> Result<(), DeleteError> {
    let remove_once = || {
        if is_dir {
            fs.remove_dir(path)
        } else {
            fs.remove_file(path)
        }
    };

    match remove_once() {
        Ok(()) => Ok(()),
        Err(first) if first.is_permission_denied() => {
            // Clear write protection on the failing entry and retry once.
            fs.clear_readonly(path).map_err(|source| DeleteError::Remove {
                path: path.to_path_buf(),
                source,
            })?;
            remove_once().map_err(|source| DeleteError::Remove {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(source) => Err(DeleteError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}
