//! Filesystem capability trait.
//!
//! The backup managers only touch the disk through this trait, so every piece
//! of rotation/archival logic can be exercised against the in-memory
//! `MockFilesystem`, including failure paths the real disk rarely produces.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::UNIX_EPOCH;

use thiserror::Error;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("path error: {0}")]
    Path(String),
}

impl FsError {
    /// Whether this error is a permission-denied condition, the one class the
    /// resilient delete is allowed to recover from.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, FsError::Io(err) if err.kind() == io::ErrorKind::PermissionDenied)
    }
}

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Trait for the filesystem operations the backup managers need.
/// Abstracted for testing with a mock implementation.
pub trait Filesystem: Send + Sync {
    /// Modification time of `path` in unix seconds, `None` if it does not exist.
    fn modified_unix_sec(&self, path: &Path) -> Result<Option<u64>, FsError>;

    /// Copy a file, preserving its modification time.
    fn copy_preserving(&self, src: &Path, dest: &Path) -> Result<(), FsError>;

    /// Rename a file or directory.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Remove a single empty directory.
    fn remove_dir(&self, path: &Path) -> Result<(), FsError>;

    /// Clear the read-only attribute on a file or directory.
    fn clear_readonly(&self, path: &Path) -> Result<(), FsError>;

    /// List the direct children of a directory, sorted by name.
    /// A missing directory lists as empty.
    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, FsError>;

    /// Check whether a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check whether a path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and its parents if needed.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Append data to a file, creating it (and parent directories) if needed.
    fn append_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn modified_unix_sec(&self, path: &Path) -> Result<Option<u64>, FsError> {
        match fs::metadata(path) {
            Ok(meta) => {
                let modified = meta.modified()?;
                let secs = modified
                    .duration_since(UNIX_EPOCH)
                    .map_err(|_| FsError::Path(format!("mtime before epoch: {}", path.display())))?
                    .as_secs();
                Ok(Some(secs))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn copy_preserving(&self, src: &Path, dest: &Path) -> Result<(), FsError> {
        fs::copy(src, dest)?;
        // fs::copy carries contents and permissions only; the archive cadence
        // depends on the copy keeping the source's modification time.
        let modified = fs::metadata(src)?.modified()?;
        let file = fs::OpenOptions::new().write(true).open(dest)?;
        file.set_modified(modified)?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to)?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_dir(path)?;
        Ok(())
    }

    fn clear_readonly(&self, path: &Path) -> Result<(), FsError> {
        let mut perms = fs::metadata(path)?.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
        Ok(())
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, FsError> {
        let mut entries = Vec::new();

        if !dir.exists() {
            return Ok(entries);
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let is_dir = entry.file_type()?.is_dir();
            entries.push(DirEntry {
                path: entry.path(),
                is_dir,
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn append_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        use std::io::Write;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(data)?;
        file.sync_data()?;

        Ok(())
    }
}

/// A file in the mock filesystem.
#[derive(Debug, Clone)]
struct MockFile {
    data: Vec<u8>,
    mtime: u64,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, MockFile>,
    dirs: HashSet<PathBuf>,
    readonly: HashSet<PathBuf>,
    fail_remove: HashSet<PathBuf>,
    fail_rename: HashSet<PathBuf>,
    fail_copy: HashSet<PathBuf>,
    fail_append: HashSet<PathBuf>,
}

impl MockState {
    fn insert_ancestors(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }

    fn has_descendants(&self, path: &Path) -> bool {
        let is_under = |p: &PathBuf| p.starts_with(path) && p != path;
        self.files.keys().any(is_under) || self.dirs.iter().any(is_under)
    }
}

/// In-memory filesystem for testing.
///
/// Tracks per-file modification times, read-only flags, and per-path failure
/// injection for remove/rename/copy/append. Cloning creates a new handle to
/// the same underlying tree.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    state: Arc<RwLock<MockState>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty file with the given modification time.
    pub fn add_file(&self, path: impl Into<PathBuf>, mtime: u64) {
        self.add_file_with_data(path, Vec::new(), mtime);
    }

    /// Add a file with contents and a modification time.
    pub fn add_file_with_data(&self, path: impl Into<PathBuf>, data: Vec<u8>, mtime: u64) {
        let path = path.into();
        let mut state = self.state.write().unwrap();
        state.insert_ancestors(&path);
        state.files.insert(path, MockFile { data, mtime });
    }

    /// Add a directory (and its ancestors).
    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut state = self.state.write().unwrap();
        state.insert_ancestors(&path);
        state.dirs.insert(path);
    }

    /// Update the modification time of an existing file, creating it empty
    /// if absent. Mirrors the game writing a save.
    pub fn touch(&self, path: impl Into<PathBuf>, mtime: u64) {
        let path = path.into();
        let mut state = self.state.write().unwrap();
        state.insert_ancestors(&path);
        state
            .files
            .entry(path)
            .and_modify(|f| f.mtime = mtime)
            .or_insert(MockFile {
                data: Vec::new(),
                mtime,
            });
    }

    /// Flag a path read-only: removal fails with permission denied until
    /// `clear_readonly` is called on it.
    pub fn set_readonly(&self, path: impl Into<PathBuf>) {
        self.state.write().unwrap().readonly.insert(path.into());
    }

    /// Make every removal of `path` fail with a non-permission error.
    pub fn inject_remove_failure(&self, path: impl Into<PathBuf>) {
        self.state.write().unwrap().fail_remove.insert(path.into());
    }

    /// Make renames of `path` fail.
    pub fn inject_rename_failure(&self, path: impl Into<PathBuf>) {
        self.state.write().unwrap().fail_rename.insert(path.into());
    }

    /// Make copies from `path` fail.
    pub fn inject_copy_failure(&self, path: impl Into<PathBuf>) {
        self.state.write().unwrap().fail_copy.insert(path.into());
    }

    /// Make appends to `path` fail.
    pub fn inject_append_failure(&self, path: impl Into<PathBuf>) {
        self.state.write().unwrap().fail_append.insert(path.into());
    }

    /// All file paths currently present, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.state.read().unwrap().files.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Contents of a file, if present.
    pub fn file_data(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.read().unwrap().files.get(path).map(|f| f.data.clone())
    }

    /// Modification time of a file, if present.
    pub fn file_mtime(&self, path: &Path) -> Option<u64> {
        self.state.read().unwrap().files.get(path).map(|f| f.mtime)
    }
}

impl Filesystem for MockFilesystem {
    fn modified_unix_sec(&self, path: &Path) -> Result<Option<u64>, FsError> {
        Ok(self.state.read().unwrap().files.get(path).map(|f| f.mtime))
    }

    fn copy_preserving(&self, src: &Path, dest: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        if state.fail_copy.contains(src) {
            return Err(FsError::Path(format!("injected copy failure: {}", src.display())));
        }
        let file = state.files.get(src).cloned().ok_or_else(|| {
            FsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", src.display()),
            ))
        })?;
        state.insert_ancestors(dest);
        state.files.insert(dest.to_path_buf(), file);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        if state.fail_rename.contains(from) {
            return Err(FsError::Path(format!("injected rename failure: {}", from.display())));
        }
        if !state.files.contains_key(from) && !state.dirs.contains(from) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such path: {}", from.display()),
            )));
        }

        let rebase = |path: &Path| -> PathBuf {
            if path == from {
                to.to_path_buf()
            } else {
                // strip_prefix cannot fail for paths collected below
                to.join(path.strip_prefix(from).unwrap())
            }
        };

        let moved_files: Vec<PathBuf> = state
            .files
            .keys()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in moved_files {
            let file = state.files.remove(&old).unwrap();
            state.files.insert(rebase(&old), file);
        }

        let moved_dirs: Vec<PathBuf> = state
            .dirs
            .iter()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in moved_dirs {
            state.dirs.remove(&old);
            state.dirs.insert(rebase(&old));
        }

        let moved_flags: Vec<PathBuf> = state
            .readonly
            .iter()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in moved_flags {
            state.readonly.remove(&old);
            state.readonly.insert(rebase(&old));
        }

        state.insert_ancestors(to);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        if state.fail_remove.contains(path) {
            return Err(FsError::Path(format!("injected remove failure: {}", path.display())));
        }
        if state.readonly.contains(path) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read-only: {}", path.display()),
            )));
        }
        if state.files.remove(path).is_none() {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )));
        }
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        if state.fail_remove.contains(path) {
            return Err(FsError::Path(format!("injected remove failure: {}", path.display())));
        }
        if state.readonly.contains(path) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read-only: {}", path.display()),
            )));
        }
        if !state.dirs.contains(path) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", path.display()),
            )));
        }
        if state.has_descendants(path) {
            return Err(FsError::Path(format!("directory not empty: {}", path.display())));
        }
        state.dirs.remove(path);
        Ok(())
    }

    fn clear_readonly(&self, path: &Path) -> Result<(), FsError> {
        self.state.write().unwrap().readonly.remove(path);
        Ok(())
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, FsError> {
        let state = self.state.read().unwrap();
        let mut entries: Vec<DirEntry> = state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .map(|p| DirEntry {
                path: p.clone(),
                is_dir: false,
            })
            .chain(
                state
                    .dirs
                    .iter()
                    .filter(|p| p.parent() == Some(dir))
                    .map(|p| DirEntry {
                        path: p.clone(),
                        is_dir: true,
                    }),
            )
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.read().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state.read().unwrap().dirs.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        state.insert_ancestors(path);
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn append_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        if state.fail_append.contains(path) {
            return Err(FsError::Path(format!("injected append failure: {}", path.display())));
        }
        state.insert_ancestors(path);
        let entry = state.files.entry(path.to_path_buf()).or_insert(MockFile {
            data: Vec::new(),
            mtime: 0,
        });
        entry.data.extend_from_slice(data);
        Ok(())
    }
}
