//! Facegate library crate (used by the server binary and integration tests).
//!
//! Verifies a probe photo against the enrolled image of a subject. Reference
//! embeddings are computed once per enrolled image and persisted, so repeat
//! verifications only pay for the probe.
//!
//! ## Modules
//! - [`normalize`]: decode, flatten and downscale uploads
//! - [`embedding`]: [`EmbeddingProvider`] trait plus stub and remote providers
//! - [`assets`]: enrolled-image lookup and fingerprinting
//! - [`storage`]: on-disk record format ([`CacheEntry`]) and atomic writes
//! - [`cache`]: [`EmbeddingCache`] trait and [`DiskEmbeddingCache`]
//! - [`scoring`]: distance and threshold decision
//! - [`verify`]: the [`Verifier`] pipeline
//! - [`gateway`]: Axum router and handlers
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod assets;
pub mod cache;
pub mod config;
pub mod embedding;
pub mod gateway;
pub mod hashing;
pub mod normalize;
pub mod scoring;
pub mod storage;
pub mod verify;

pub use assets::{AssetError, AssetResolver, FilesystemAssetResolver, FingerprintMode};
#[cfg(any(test, feature = "mock"))]
pub use assets::MockAssetResolver;

pub use cache::{
    CacheError, CacheStatus, DiskEmbeddingCache, EmbeddingCache, FACEGATE_STATUS_HEADER,
};
#[cfg(any(test, feature = "mock"))]
pub use cache::MockEmbeddingCache;

pub use config::{Config, ConfigError};

pub use embedding::{
    DEFAULT_EMBEDDING_DIM, Embedding, EmbeddingBackend, EmbeddingError, EmbeddingProvider,
    FacePolicy, RemoteEmbeddingProvider, RemoteProviderConfig, StubEmbeddingProvider,
};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbeddingProvider;

pub use hashing::{Fingerprint, fingerprint_content, subject_key};
pub use normalize::{ImageNormalizer, NormalizeError, NormalizedImage};
pub use scoring::{DEFAULT_THRESHOLD, Decision, DecisionEngine, MatchOperator, ScoringError};
pub use storage::{CacheEntry, StorageError};
pub use verify::{ImageRole, VerificationResult, Verifier, VerifierConfig, VerifyError};
