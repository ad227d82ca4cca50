//! Filesystem layer for the autosaver.
//!
//! Provides the `Filesystem` capability trait (real and mock), the save-slot
//! model, and the backup managers built on top of them:
//! - `transfer` — copy a slot's related file set, tolerating missing files
//! - `delete` — recursive removal that recovers from read-only entries
//! - `rotation` — numbered generation shifting with bounded retention
//! - `archive` — sparse, timestamp-labeled long-term snapshots

pub mod archive;
pub mod delete;
pub mod fs;
pub mod rotation;
pub mod slot;
pub mod transfer;

pub use archive::{
    archive_label, copy_to_archive, latest_archive_mtime, should_archive, ArchiveOutcome,
};
pub use delete::{delete_tree, DeleteError};
pub use fs::{DirEntry, Filesystem, FsError, MockFilesystem, RealFilesystem};
pub use rotation::{copy_to_rotating, generation_dir, rotate_slot, RotationError, RotationOutcome};
pub use slot::{Slot, SLOT_COUNT};
pub use transfer::{copy_related, CopyError};
