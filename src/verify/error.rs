use thiserror::Error;

use crate::cache::CacheError;
use crate::normalize::NormalizeError;
use crate::verify::types::ImageRole;

/// Every way a verification can fail. "No match" is not an error.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("failed to decode {role} image: {source}")]
    ImageDecode {
        role: ImageRole,
        #[source]
        source: NormalizeError,
    },

    #[error("no enrolled image for subject '{subject_id}'")]
    SubjectNotFound { subject_id: String },

    #[error("no face detected in the enrolled image for '{subject_id}'")]
    NoFaceInReference { subject_id: String },

    #[error("no face detected in the probe image")]
    NoFaceInProbe,

    #[error("{count} faces detected in the {role} image, expected exactly one")]
    MultipleFaces { role: ImageRole, count: usize },

    #[error("embedding dimensions differ: reference {reference}, probe {probe}")]
    DimensionMismatch { reference: usize, probe: usize },

    #[error("embedding provider did not answer within {timeout_ms} ms")]
    ProviderTimeout { timeout_ms: u64 },

    #[error("embedding provider failed: {reason}")]
    ProviderError { reason: String },

    #[error("embedding cache failed: {0}")]
    Cache(#[from] CacheError),

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl VerifyError {
    /// Stable snake_case identifier, used in responses and status headers.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::InvalidRequest { .. } => "invalid_request",
            VerifyError::ImageDecode { .. } => "image_decode_error",
            VerifyError::SubjectNotFound { .. } => "subject_not_found",
            VerifyError::NoFaceInReference { .. } => "no_face_in_reference",
            VerifyError::NoFaceInProbe => "no_face_in_probe",
            VerifyError::MultipleFaces { .. } => "multiple_faces",
            VerifyError::DimensionMismatch { .. } => "dimension_mismatch",
            VerifyError::ProviderTimeout { .. } => "provider_timeout",
            VerifyError::ProviderError { .. } => "provider_error",
            VerifyError::Cache(_) => "cache_error",
            VerifyError::Internal { .. } => "internal",
        }
    }

    /// The caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VerifyError::ProviderTimeout { .. } | VerifyError::ProviderError { .. }
        )
    }

    /// The request itself was at fault (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VerifyError::InvalidRequest { .. }
                | VerifyError::ImageDecode { .. }
                | VerifyError::SubjectNotFound { .. }
                | VerifyError::NoFaceInReference { .. }
                | VerifyError::NoFaceInProbe
                | VerifyError::MultipleFaces { .. }
        )
    }

    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        VerifyError::InvalidRequest {
            reason: reason.into(),
        }
    }
}
