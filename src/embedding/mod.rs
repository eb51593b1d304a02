//! Embedding acquisition.
//!
//! - [`EmbeddingProvider`] is the seam to the external feature extractor.
//! - [`StubEmbeddingProvider`] is a deterministic, model-free provider for tests and dev.
//! - [`RemoteEmbeddingProvider`] delegates to an HTTP extraction service.
//! - [`FacePolicy`] picks one face out of a provider response.

mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod policy;
pub mod provider;
pub mod remote;
pub mod stub;
mod types;


pub use error::EmbeddingError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbeddingProvider;
pub use policy::{FacePolicy, FaceSelectionError};
pub use provider::{EmbeddingBackend, EmbeddingProvider};
pub use remote::{RemoteEmbeddingProvider, RemoteProviderConfig};
pub use stub::{STUB_EMBEDDING_DIM, STUB_MODEL_ID, StubEmbeddingProvider};
pub use types::Embedding;

/// Default embedding dimension (dlib ResNet face encoder).
pub const DEFAULT_EMBEDDING_DIM: usize = 128;
