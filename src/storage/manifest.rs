//! Cache directory manifest.
//!
//! Pins the provider id and embedding dimension a cache directory was built
//! with so embeddings from different models are never mixed.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::{CACHE_FORMAT_VERSION, StorageError, StorageResult};

pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub format_version: u16,
    pub provider: String,
    pub dimension: usize,
}

impl CacheManifest {
    pub fn new(provider: &str, dimension: usize) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            provider: provider.to_string(),
            dimension,
        }
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(MANIFEST_FILENAME)
    }

    /// Reads the manifest under `root`, or `None` if the directory has none yet.
    pub fn load(root: &Path) -> StorageResult<Option<Self>> {
        let path = Self::path(root);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StorageError::InvalidManifest {
                path,
                reason: e.to_string(),
            })
    }

    /// Opens the manifest under `root`, writing one on first use.
    ///
    /// Fails with [`StorageError::ManifestMismatch`] if the directory was built
    /// for another provider or dimension, and with
    /// [`StorageError::InvalidManifest`] for an unknown format version.
    pub fn open_or_create(root: &Path, provider: &str, dimension: usize) -> StorageResult<Self> {
        let expected = Self::new(provider, dimension);

        match Self::load(root)? {
            Some(found) => {
                if found.format_version != CACHE_FORMAT_VERSION {
                    return Err(StorageError::InvalidManifest {
                        path: Self::path(root),
                        reason: format!(
                            "format version {} is not supported (expected {})",
                            found.format_version, CACHE_FORMAT_VERSION
                        ),
                    });
                }
                if found.provider != expected.provider || found.dimension != expected.dimension {
                    return Err(StorageError::ManifestMismatch {
                        path: Self::path(root),
                        expected_provider: expected.provider,
                        expected_dimension: expected.dimension,
                        found_provider: found.provider,
                        found_dimension: found.dimension,
                    });
                }
                Ok(found)
            }
            None => {
                expected.write(root)?;
                Ok(expected)
            }
        }
    }

    fn write(&self, root: &Path) -> StorageResult<()> {
        let path = Self::path(root);
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut temp = tempfile::NamedTempFile::new_in(root)?;
        temp.write_all(&json)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| StorageError::WriteFailed {
            path,
            reason: e.error.to_string(),
        })?;
        Ok(())
    }
}
