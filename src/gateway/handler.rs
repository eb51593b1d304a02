use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::assets::AssetResolver;
use crate::cache::{
    CacheStatus, EmbeddingCache, FACEGATE_STATUS_EVICTED, FACEGATE_STATUS_HEADER,
    FACEGATE_STATUS_MATCH, FACEGATE_STATUS_NO_MATCH,
};
use crate::embedding::EmbeddingProvider;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::scoring::MatchOperator;
use crate::verify::VerificationResult;

pub const IMAGE_FIELD: &str = "image";
pub const SUBJECT_FIELD: &str = "user_image_name";

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    #[serde(rename = "match")]
    pub matched: bool,
    pub distance: f64,
    pub tolerance: f64,
    pub operator: MatchOperator,
    pub cache: CacheStatus,
    pub message: &'static str,
}

impl From<&VerificationResult> for VerifyResponse {
    fn from(result: &VerificationResult) -> Self {
        Self {
            matched: result.matched,
            distance: result.distance,
            tolerance: result.threshold,
            operator: result.operator,
            cache: result.cache,
            message: result.message(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvictResponse {
    pub subject_id: String,
    pub evicted: bool,
}

#[derive(Debug, Default)]
struct VerifyUpload {
    image: Option<Vec<u8>>,
    subject_id: Option<String>,
}

#[instrument(skip_all, fields(subject_id = tracing::field::Empty))]
pub async fn verify_handler<P, R, C>(
    State(state): State<HandlerState<P, R, C>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, GatewayError>
where
    P: EmbeddingProvider + 'static,
    R: AssetResolver + 'static,
    C: EmbeddingCache + 'static,
{
    let multipart = multipart.map_err(|e| GatewayError::Upload {
        status: e.status(),
        message: e.body_text(),
    })?;
    let upload = read_upload(multipart).await?;

    let (Some(image), Some(subject_id)) = (upload.image, upload.subject_id) else {
        return Err(GatewayError::InvalidRequest(format!(
            "both '{IMAGE_FIELD}' and '{SUBJECT_FIELD}' are required"
        )));
    };
    tracing::Span::current().record("subject_id", subject_id.as_str());
    debug!(image_len = image.len(), "Upload received");

    let result = state.verifier.verify(&image, &subject_id).await?;

    let status = if result.matched {
        FACEGATE_STATUS_MATCH
    } else {
        FACEGATE_STATUS_NO_MATCH
    };
    let mut headers = HeaderMap::new();
    headers.insert(FACEGATE_STATUS_HEADER, HeaderValue::from_static(status));

    Ok((StatusCode::OK, headers, Json(VerifyResponse::from(&result))).into_response())
}

async fn read_upload(mut multipart: Multipart) -> Result<VerifyUpload, GatewayError> {
    let mut upload = VerifyUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        match field.name() {
            Some(IMAGE_FIELD) => {
                let bytes = field.bytes().await.map_err(upload_error)?;
                upload.image = Some(bytes.to_vec()).filter(|b| !b.is_empty());
            }
            Some(SUBJECT_FIELD) => {
                let text = field.text().await.map_err(upload_error)?;
                upload.subject_id = Some(text.trim().to_string()).filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    Ok(upload)
}

fn upload_error(err: axum::extract::multipart::MultipartError) -> GatewayError {
    GatewayError::Upload {
        status: err.status(),
        message: err.body_text(),
    }
}

#[instrument(skip(state))]
pub async fn evict_handler<P, R, C>(
    State(state): State<HandlerState<P, R, C>>,
    Path(subject_id): Path<String>,
) -> Result<Response, GatewayError>
where
    P: EmbeddingProvider + 'static,
    R: AssetResolver + 'static,
    C: EmbeddingCache + 'static,
{
    let evicted = state.verifier.evict(&subject_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        FACEGATE_STATUS_HEADER,
        HeaderValue::from_static(if evicted {
            FACEGATE_STATUS_EVICTED
        } else {
            CacheStatus::Miss.as_str()
        }),
    );

    Ok((
        StatusCode::OK,
        headers,
        Json(EvictResponse {
            subject_id: subject_id.trim().to_string(),
            evicted,
        }),
    )
        .into_response())
}

pub async fn root_handler() -> &'static str {
    "Face Recognition API is running!"
}
