use std::future::Future;

use crate::embedding::error::EmbeddingError;
use crate::embedding::remote::RemoteEmbeddingProvider;
use crate::embedding::stub::StubEmbeddingProvider;
use crate::embedding::types::Embedding;
use crate::normalize::NormalizedImage;

/// External feature extractor.
///
/// Returns zero or more embeddings ordered by detector confidence; an empty
/// list means no face was detected. Implementations must be stateless from the
/// caller's point of view.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifies the model/version. Embeddings from different ids never mix.
    fn model_id(&self) -> &str;

    /// Length of every embedding this provider returns.
    fn dimension(&self) -> usize;

    /// Runs detection + encoding on a normalized image.
    fn extract(
        &self,
        image: &NormalizedImage,
    ) -> impl Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send;
}

/// Provider chosen at startup (stub when no extraction service is configured).
#[derive(Debug)]
pub enum EmbeddingBackend {
    Stub(StubEmbeddingProvider),
    Remote(RemoteEmbeddingProvider),
}

impl EmbeddingBackend {
    pub fn is_stub(&self) -> bool {
        matches!(self, EmbeddingBackend::Stub(_))
    }
}

impl EmbeddingProvider for EmbeddingBackend {
    fn model_id(&self) -> &str {
        match self {
            EmbeddingBackend::Stub(p) => p.model_id(),
            EmbeddingBackend::Remote(p) => p.model_id(),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            EmbeddingBackend::Stub(p) => p.dimension(),
            EmbeddingBackend::Remote(p) => p.dimension(),
        }
    }

    async fn extract(&self, image: &NormalizedImage) -> Result<Vec<Embedding>, EmbeddingError> {
        match self {
            EmbeddingBackend::Stub(p) => p.extract(image).await,
            EmbeddingBackend::Remote(p) => p.extract(image).await,
        }
    }
}
