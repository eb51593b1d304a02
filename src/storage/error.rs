use std::path::PathBuf;
use thiserror::Error;

use crate::storage::mmap::MmapError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mmap error: {0}")]
    Mmap(#[from] MmapError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("write failed for {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("corrupt cache record {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("storage path unavailable: {path}")]
    StorageUnavailable { path: PathBuf },

    #[error("invalid manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error(
        "cache at {path} was built by provider '{found_provider}' ({found_dimension}-d), \
         refusing to mix with '{expected_provider}' ({expected_dimension}-d)"
    )]
    ManifestMismatch {
        path: PathBuf,
        expected_provider: String,
        expected_dimension: usize,
        found_provider: String,
        found_dimension: usize,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;
