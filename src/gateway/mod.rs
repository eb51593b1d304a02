//! HTTP gateway (Axum) exposing face verification.
//!
//! Routes:
//! - `POST /face-verify`, `POST /verify-face`: multipart `image` + `user_image_name`
//! - `DELETE /v1/subjects/{subject_id}/embedding`: drop a cached reference embedding
//! - `GET /`, `GET /healthz`, `GET /ready`

pub mod error;
pub mod handler;
pub mod state;

#[cfg(test)]
mod handler_tests;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{evict_handler, root_handler, verify_handler};
pub use state::HandlerState;

use crate::assets::AssetResolver;
use crate::cache::{
    EmbeddingCache, FACEGATE_STATUS_HEADER, FACEGATE_STATUS_HEALTHY, FACEGATE_STATUS_NOT_READY,
    FACEGATE_STATUS_READY,
};
use crate::embedding::EmbeddingProvider;

pub fn create_router_with_state<P, R, C>(state: HandlerState<P, R, C>, max_upload_bytes: usize) -> Router
where
    P: EmbeddingProvider + 'static,
    R: AssetResolver + 'static,
    C: EmbeddingCache + 'static,
{
    Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/face-verify", post(verify_handler))
        .route("/verify-face", post(verify_handler))
        .route("/v1/subjects/{subject_id}/embedding", delete(evict_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub assets: &'static str,
    pub cache: &'static str,
    pub cached_subjects: Option<usize>,
    pub embedder_mode: &'static str,
    pub embedder_model: String,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        FACEGATE_STATUS_HEADER,
        HeaderValue::from_static(FACEGATE_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler<P, R, C>(State(state): State<HandlerState<P, R, C>>) -> Response
where
    P: EmbeddingProvider + 'static,
    R: AssetResolver + 'static,
    C: EmbeddingCache + 'static,
{
    let verifier = &state.verifier;

    let readiness = |ok: bool| {
        if ok {
            FACEGATE_STATUS_READY
        } else {
            FACEGATE_STATUS_NOT_READY
        }
    };

    let cached_subjects = match verifier.cache().len() {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to count cached subjects");
            None
        }
    };

    let components = ComponentStatus {
        http: FACEGATE_STATUS_READY,
        assets: readiness(verifier.resolver().is_ready()),
        cache: readiness(verifier.cache().is_ready() && cached_subjects.is_some()),
        cached_subjects,
        embedder_mode: state.embedder_mode,
        embedder_model: verifier.provider().model_id().to_string(),
    };

    let is_ready =
        components.assets == FACEGATE_STATUS_READY && components.cache == FACEGATE_STATUS_READY;

    let (status_code, status_msg) = if is_ready {
        (StatusCode::OK, FACEGATE_STATUS_READY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, FACEGATE_STATUS_NOT_READY)
    };

    let mut headers = HeaderMap::new();
    headers.insert(FACEGATE_STATUS_HEADER, HeaderValue::from_static(status_msg));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
