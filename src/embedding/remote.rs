//! HTTP client for an external face-encoding service.
//!
//! Wire format: `POST {url}` with the normalized image as `image/png`; the
//! service answers `{"embeddings": [[f64, ...], ...]}` ordered by detector
//! confidence (empty list when no face is found).

use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::embedding::error::EmbeddingError;
use crate::embedding::provider::EmbeddingProvider;
use crate::embedding::types::Embedding;
use crate::normalize::NormalizedImage;

/// Header carrying the expected model id so the service can refuse a mismatch.
pub const MODEL_HEADER: &str = "X-Facegate-Model";

#[derive(Debug, Clone)]
pub struct RemoteProviderConfig {
    pub url: String,
    pub model_id: String,
    pub dimension: usize,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    embeddings: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct RemoteEmbeddingProvider {
    client: reqwest::Client,
    config: RemoteProviderConfig,
}

impl RemoteEmbeddingProvider {
    pub fn new(config: RemoteProviderConfig) -> Result<Self, EmbeddingError> {
        if config.url.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "provider url is empty".to_string(),
            });
        }
        if config.dimension == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "embedding dimension must be positive".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: format!("failed to build http client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn map_transport_error(&self, err: reqwest::Error, started: Instant) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }
        } else {
            EmbeddingError::RequestFailed {
                reason: err.to_string(),
            }
        }
    }
}

impl EmbeddingProvider for RemoteEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    #[instrument(skip(self, image), fields(url = %self.config.url, width = image.width(), height = image.height()))]
    async fn extract(&self, image: &NormalizedImage) -> Result<Vec<Embedding>, EmbeddingError> {
        let body = image.encode_png()?;
        let started = Instant::now();

        let response = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "image/png")
            .header(MODEL_HEADER, &self.config.model_id)
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, started))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::RequestFailed {
                reason: format!("provider returned HTTP {}", status),
            });
        }

        let parsed: ExtractResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_transport_error(e, started)
            } else {
                EmbeddingError::InvalidResponse {
                    reason: e.to_string(),
                }
            }
        })?;

        debug!(
            faces = parsed.embeddings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Remote provider responded"
        );

        Ok(parsed.embeddings.into_iter().map(Embedding::new).collect())
    }
}
