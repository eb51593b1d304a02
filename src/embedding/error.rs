use thiserror::Error;

use crate::normalize::NormalizeError;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("embedding provider request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("embedding provider returned an invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("invalid embedding: {reason}")]
    InvalidEmbedding { reason: String },

    #[error("failed to prepare image for provider: {0}")]
    Encode(#[from] NormalizeError),

    #[error("invalid provider configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl EmbeddingError {
    /// Returns `true` if the provider did not answer in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EmbeddingError::Timeout { .. })
    }
}
