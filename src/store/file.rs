//! store::file
//!
//! File-based byte backend.
//!
//! # Storage
//!
//! - `<path>` - the value blob
//! - `<path>.lock` - lock file with an OS-level exclusive lock
//!
//! # Atomicity
//!
//! All writes go through a temp file followed by a rename, so a reader
//! observes either the old blob or the new one, never a partial write.
//! Writers additionally hold an OS-level exclusive lock (via `fs2`) for the
//! duration of the write, which serializes writers across processes. The
//! lock is released on drop (RAII pattern), even if the write panics.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::traits::{StoreBackend, StoreError};

/// File-based [`StoreBackend`] persisting one blob per file.
///
/// # Example
///
/// ```
/// use keylens::store::{FileBackend, StoreBackend};
///
/// let dir = tempfile::tempdir().unwrap();
/// let backend = FileBackend::new(dir.path().join("root.json"));
///
/// backend.save_bytes(b"{}").unwrap();
/// assert_eq!(backend.load_bytes().unwrap(), Some(b"{}".to_vec()));
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    /// Path to the value file.
    path: PathBuf,
}

/// Exclusive write lock on a backend's lock file, released on drop.
struct WriteLock {
    file: File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileBackend {
    /// Create a backend persisting to the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the value file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling lock-file path: `<file name>.lock`.
    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Acquire the exclusive writer lock, creating directories as needed.
    ///
    /// Blocks until the lock is available. Cross-process writers on the
    /// same path serialize here.
    fn acquire_write_lock(&self) -> Result<WriteLock, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::System(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| {
                StoreError::System(format!("cannot open {}: {}", lock_path.display(), e))
            })?;

        file.lock_exclusive().map_err(|e| {
            StoreError::System(format!("cannot lock {}: {}", lock_path.display(), e))
        })?;

        Ok(WriteLock { file })
    }
}

impl StoreBackend for FileBackend {
    fn save_bytes(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let _lock = self.acquire_write_lock()?;

        // Write to a temp file first for atomicity
        let mut temp_name = self.path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| {
                    StoreError::System(format!("cannot create {}: {}", temp_path.display(), e))
                })?;

            file.write_all(bytes).map_err(|e| {
                StoreError::System(format!("cannot write {}: {}", temp_path.display(), e))
            })?;

            file.sync_all().map_err(|e| {
                StoreError::System(format!("cannot sync {}: {}", temp_path.display(), e))
            })?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(|e| {
            StoreError::System(format!("cannot rename into {}: {}", self.path.display(), e))
        })
    }

    fn load_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::System(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn remove_bytes(&self) -> Result<(), StoreError> {
        let _lock = self.acquire_write_lock()?;

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::System(format!(
                "cannot remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
