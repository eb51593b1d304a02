//! Deterministic model-free provider.
//!
//! The "embedding" is a 16x8 grayscale thumbnail, mean-centred and scaled to
//! unit length. Images with no luminance variation report no face. Good enough
//! to exercise the pipeline end to end; useless as a biometric.

use image::imageops::{self, FilterType};
use tracing::trace;

use crate::embedding::error::EmbeddingError;
use crate::embedding::provider::EmbeddingProvider;
use crate::embedding::types::Embedding;
use crate::normalize::NormalizedImage;

const GRID_WIDTH: u32 = 16;
const GRID_HEIGHT: u32 = 8;

/// Output dimension of the stub provider.
pub const STUB_EMBEDDING_DIM: usize = (GRID_WIDTH * GRID_HEIGHT) as usize;

/// Model id recorded in cache entries produced by the stub.
pub const STUB_MODEL_ID: &str = "stub-thumbnail-v1";

const FLAT_IMAGE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default)]
pub struct StubEmbeddingProvider;

impl StubEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`EmbeddingProvider::extract`].
    pub fn embed(&self, image: &NormalizedImage) -> Option<Embedding> {
        let gray = imageops::grayscale(image.pixels());
        let thumb = imageops::resize(&gray, GRID_WIDTH, GRID_HEIGHT, FilterType::Triangle);

        let values: Vec<f64> = thumb.pixels().map(|p| f64::from(p.0[0]) / 255.0).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let centred: Vec<f64> = values.iter().map(|v| v - mean).collect();
        let norm = centred.iter().map(|v| v * v).sum::<f64>().sqrt();

        if norm < FLAT_IMAGE_EPSILON {
            trace!("Stub provider found no luminance variation");
            return None;
        }

        Some(Embedding::new(centred.into_iter().map(|v| v / norm).collect()))
    }
}

impl EmbeddingProvider for StubEmbeddingProvider {
    fn model_id(&self) -> &str {
        STUB_MODEL_ID
    }

    fn dimension(&self) -> usize {
        STUB_EMBEDDING_DIM
    }

    async fn extract(&self, image: &NormalizedImage) -> Result<Vec<Embedding>, EmbeddingError> {
        Ok(self.embed(image).into_iter().collect())
    }
}
