use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("embedding has {actual} dimensions, cache holds {expected}-d embeddings")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cached embedding for '{subject_id}' was produced by '{found}', expected '{expected}'")]
    ProviderMismatch {
        subject_id: String,
        expected: String,
        found: String,
    },

    #[error("cached record for '{subject_id}' is unreadable: {reason}")]
    Corrupt { subject_id: String, reason: String },

    #[error("background cache task failed: {reason}")]
    Background { reason: String },
}

impl CacheError {
    /// Returns `true` when the record can simply be recomputed and overwritten.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::Corrupt { .. }
                | CacheError::Background { .. }
                | CacheError::Storage(
                    StorageError::Io(_) | StorageError::Mmap(_) | StorageError::Corrupt { .. }
                )
        )
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
