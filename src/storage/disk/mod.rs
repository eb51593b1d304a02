//! One-file-per-subject record store.
//!
//! Records are written to a temp file in the cache directory, synced, then
//! renamed over `<blake3(subject_id)>.rkyv`. Readers only ever map whole files.


use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rkyv::rancor::Error as RkyvError;
use rkyv::to_bytes;
use tempfile::NamedTempFile;

use crate::hashing::subject_key;
use crate::storage::mmap::{MmapError, MmapFileHandle};
use crate::storage::{
    ArchivedCacheEntry, CACHE_FORMAT_VERSION, CacheEntry, StorageError, StorageResult,
};

pub const RECORD_EXTENSION: &str = "rkyv";

const TEMP_PREFIX: &str = ".record-";

/// Stores and retrieves [`CacheEntry`] records on disk.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if it is missing.
    pub fn ensure_root(&self) -> StorageResult<()> {
        if !self.root.is_dir() {
            fs::create_dir_all(&self.root).map_err(|_| StorageError::StorageUnavailable {
                path: self.root.clone(),
            })?;
        }
        Ok(())
    }

    pub fn entry_path(&self, subject_id: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", subject_key(subject_id), RECORD_EXTENSION))
    }

    /// Atomically replaces the record for `entry.subject_id`.
    pub fn store(&self, entry: &CacheEntry) -> StorageResult<()> {
        self.ensure_root()?;

        let bytes =
            to_bytes::<RkyvError>(entry).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let final_path = self.entry_path(&entry.subject_id);

        let write_failed = |reason: String| StorageError::WriteFailed {
            path: final_path.clone(),
            reason,
        };

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.root)
            .map_err(|e| write_failed(e.to_string()))?;
        write_record(&mut temp, &bytes).map_err(|e| write_failed(e.to_string()))?;
        temp.persist(&final_path)
            .map_err(|e| write_failed(e.error.to_string()))?;

        sync_dir(&self.root);
        Ok(())
    }

    /// Loads the record for `subject_id`, or `None` if there is none.
    ///
    /// A file that fails archive validation is reported as
    /// [`StorageError::Corrupt`].
    pub fn load(&self, subject_id: &str) -> StorageResult<Option<CacheEntry>> {
        let path = self.entry_path(subject_id);

        let handle = match MmapFileHandle::open(&path) {
            Ok(handle) => handle,
            Err(MmapError::Io(e)) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(MmapError::EmptyRecord) => {
                return Err(StorageError::Corrupt {
                    path,
                    reason: "empty record file".to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let archived = handle
            .access_archived::<ArchivedCacheEntry>()
            .map_err(|e| StorageError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let entry = rkyv::deserialize::<CacheEntry, RkyvError>(archived).map_err(|e| {
            StorageError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        if entry.format_version != CACHE_FORMAT_VERSION {
            return Err(StorageError::Corrupt {
                path,
                reason: format!(
                    "format version {} is not supported (expected {})",
                    entry.format_version, CACHE_FORMAT_VERSION
                ),
            });
        }
        if entry.subject_id != subject_id {
            return Err(StorageError::Corrupt {
                path,
                reason: format!("record belongs to subject '{}'", entry.subject_id),
            });
        }

        Ok(Some(entry))
    }

    /// Removes the record for `subject_id`. Returns `true` if one existed.
    pub fn delete(&self, subject_id: &str) -> StorageResult<bool> {
        match fs::remove_file(self.entry_path(subject_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, subject_id: &str) -> bool {
        self.entry_path(subject_id).is_file()
    }

    /// Counts record files under the root.
    pub fn count(&self) -> StorageResult<usize> {
        if !self.root.is_dir() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if let Some(ext) = path.extension()
                && ext == RECORD_EXTENSION
                && path.is_file()
            {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn write_record(temp: &mut NamedTempFile, bytes: &[u8]) -> std::io::Result<()> {
    temp.write_all(bytes)?;
    temp.as_file().sync_all()
}

// Best effort: makes the rename itself durable on unix filesystems.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
    #[cfg(not(unix))]
    let _ = dir;
}
