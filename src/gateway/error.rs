use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cache::FACEGATE_STATUS_HEADER;
use crate::verify::VerifyError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidRequest(String),

    /// Multipart body could not be read; carries the status axum assigned.
    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    #[error(transparent)]
    Verify(#[from] VerifyError),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "match")]
    pub matched: bool,
    pub error: &'static str,
    pub message: String,
}

/// Maps every verification failure kind to its HTTP status.
pub fn status_for(err: &VerifyError) -> StatusCode {
    match err {
        VerifyError::InvalidRequest { .. }
        | VerifyError::ImageDecode { .. }
        | VerifyError::NoFaceInProbe
        | VerifyError::NoFaceInReference { .. }
        | VerifyError::MultipleFaces { .. } => StatusCode::BAD_REQUEST,
        VerifyError::SubjectNotFound { .. } => StatusCode::NOT_FOUND,
        VerifyError::ProviderError { .. } => StatusCode::BAD_GATEWAY,
        VerifyError::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        VerifyError::DimensionMismatch { .. }
        | VerifyError::Cache(_)
        | VerifyError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upload { status, .. } => *status,
            GatewayError::Verify(err) => status_for(err),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::Upload { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "payload_too_large"
            }
            GatewayError::Upload { .. } => "invalid_request",
            GatewayError::Verify(err) => err.kind(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        if status.is_server_error() {
            tracing::error!(error = %self, kind, "Verification failed");
        } else {
            tracing::info!(error = %self, kind, "Verification rejected");
        }

        let mut headers = HeaderMap::new();
        headers.insert(FACEGATE_STATUS_HEADER, HeaderValue::from_static(kind));

        let body = Json(ErrorResponse {
            matched: false,
            error: kind,
            message: self.to_string(),
        });

        (status, headers, body).into_response()
    }
}
