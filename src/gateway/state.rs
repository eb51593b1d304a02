use std::sync::Arc;

use crate::assets::AssetResolver;
use crate::cache::EmbeddingCache;
use crate::embedding::EmbeddingProvider;
use crate::verify::Verifier;

pub struct HandlerState<P, R, C> {
    pub verifier: Arc<Verifier<P, R, C>>,

    /// Reported by `/ready`: `stub` or `remote`.
    pub embedder_mode: &'static str,
}

impl<P, R, C> Clone for HandlerState<P, R, C> {
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            embedder_mode: self.embedder_mode,
        }
    }
}

impl<P, R, C> HandlerState<P, R, C>
where
    P: EmbeddingProvider + 'static,
    R: AssetResolver + 'static,
    C: EmbeddingCache + 'static,
{
    pub fn new(verifier: Arc<Verifier<P, R, C>>) -> Self {
        Self {
            verifier,
            embedder_mode: "remote",
        }
    }

    pub fn with_embedder_mode(mut self, mode: &'static str) -> Self {
        self.embedder_mode = mode;
        self
    }
}
