//! Verification orchestrator.
//!
//! [`Verifier::verify`] runs one linear pipeline per request:
//!
//! 1. validate the request
//! 2. normalize the probe
//! 3. fingerprint the enrolled image (unknown subject fails here)
//! 4. extract the probe embedding
//! 5. fetch the reference embedding from the cache, computing and storing it
//!    under the subject lock on a miss or stale fingerprint
//! 6. decide
//!
//! The probe is embedded before the cache is touched, so a request with an
//! unusable probe never writes a cache entry.

pub mod error;
pub mod types;


pub use error::VerifyError;
pub use types::{DEFAULT_PROVIDER_TIMEOUT, ImageRole, VerificationResult, VerifierConfig};

use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::assets::{AssetError, AssetResolver};
use crate::cache::{CacheError, CacheStatus, EmbeddingCache};
use crate::embedding::{Embedding, EmbeddingProvider, FaceSelectionError};
use crate::hashing::Fingerprint;
use crate::normalize::{ImageNormalizer, NormalizedImage};
use crate::scoring::{DecisionEngine, ScoringError};

enum CachedReference {
    Fresh(Embedding),
    Stale,
    Missing,
}

/// Composes normalizer, provider, resolver, cache and decision engine.
pub struct Verifier<P, R, C> {
    provider: P,
    resolver: R,
    cache: C,
    engine: DecisionEngine,
    config: VerifierConfig,
}

impl<P, R, C> std::fmt::Debug for Verifier<P, R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P, R, C> Verifier<P, R, C>
where
    P: EmbeddingProvider,
    R: AssetResolver,
    C: EmbeddingCache,
{
    pub fn new(provider: P, resolver: R, cache: C, config: VerifierConfig) -> Result<Self, ScoringError> {
        let engine = DecisionEngine::new(config.threshold, config.operator)?;
        Ok(Self {
            provider,
            resolver,
            cache,
            engine,
            config,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Decides whether `probe` shows the subject enrolled as `subject_id`.
    #[instrument(skip(self, probe), fields(probe_len = probe.len()))]
    pub async fn verify(
        &self,
        probe: &[u8],
        subject_id: &str,
    ) -> Result<VerificationResult, VerifyError> {
        let start = Instant::now();
        let subject_id = subject_id.trim();

        if probe.is_empty() {
            return Err(VerifyError::invalid_request("probe image is empty"));
        }
        if subject_id.is_empty() {
            return Err(VerifyError::invalid_request("subject id is empty"));
        }

        let probe_image = self.normalize(probe.to_vec(), ImageRole::Probe).await?;
        let fingerprint = self
            .resolver
            .fingerprint(subject_id)
            .map_err(map_asset_error)?;

        let probe_embedding = self
            .extract(&probe_image, ImageRole::Probe, subject_id)
            .await?;
        let (reference, cache) = self.reference_embedding(subject_id, fingerprint).await?;

        let decision = self
            .engine
            .decide(reference.as_slice(), probe_embedding.as_slice())
            .map_err(|e| match e {
                ScoringError::DimensionMismatch { left, right } => VerifyError::DimensionMismatch {
                    reference: left,
                    probe: right,
                },
                other => VerifyError::Internal {
                    reason: other.to_string(),
                },
            })?;

        info!(
            subject_id,
            matched = decision.matched,
            distance = decision.distance,
            threshold = self.engine.threshold(),
            cache = cache.as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Verification complete"
        );

        Ok(VerificationResult {
            subject_id: subject_id.to_string(),
            matched: decision.matched,
            distance: decision.distance,
            threshold: self.engine.threshold(),
            operator: self.engine.operator(),
            reason: decision.reason(),
            cache,
        })
    }

    /// Drops the cached reference embedding for `subject_id`.
    #[instrument(skip(self))]
    pub async fn evict(&self, subject_id: &str) -> Result<bool, VerifyError> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(VerifyError::invalid_request("subject id is empty"));
        }

        let _guard = self.cache.lock_subject(subject_id).await;
        Ok(self.cache.invalidate(subject_id).await?)
    }

    async fn reference_embedding(
        &self,
        subject_id: &str,
        fingerprint: Fingerprint,
    ) -> Result<(Embedding, CacheStatus), VerifyError> {
        if let CachedReference::Fresh(embedding) =
            self.cached_reference(subject_id, &fingerprint).await?
        {
            return Ok((embedding, CacheStatus::Hit));
        }

        let _guard = self.cache.lock_subject(subject_id).await;

        // Another request may have filled the entry while we waited.
        let status = match self.cached_reference(subject_id, &fingerprint).await? {
            CachedReference::Fresh(embedding) => return Ok((embedding, CacheStatus::Hit)),
            CachedReference::Stale => CacheStatus::Stale,
            CachedReference::Missing => CacheStatus::Miss,
        };
        debug!(status = status.as_str(), "Computing reference embedding");

        let enrolled = self.resolver.load(subject_id).map_err(map_asset_error)?;
        let image = self.normalize(enrolled.bytes, ImageRole::Reference).await?;
        let embedding = self
            .extract(&image, ImageRole::Reference, subject_id)
            .await?;

        // The record must carry the fingerprint of the bytes that were embedded.
        let Some(source) = enrolled.fingerprint else {
            warn!("Enrolled image changed while being read, not persisting");
            return Ok((embedding, CacheStatus::Degraded));
        };
        if source != fingerprint {
            debug!("Enrolled image replaced during the request");
        }

        match self.cache.store(subject_id, &embedding, source).await {
            Ok(_) => Ok((embedding, status)),
            Err(e @ CacheError::DimensionMismatch { .. }) => Err(e.into()),
            Err(e) if self.config.require_persistence => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Reference embedding not persisted, continuing degraded");
                Ok((embedding, CacheStatus::Degraded))
            }
        }
    }

    async fn cached_reference(
        &self,
        subject_id: &str,
        fingerprint: &Fingerprint,
    ) -> Result<CachedReference, VerifyError> {
        match self.cache.lookup(subject_id).await {
            Ok(Some(entry)) if entry.is_fresh(fingerprint) => {
                Ok(CachedReference::Fresh(Embedding::from(entry.embedding)))
            }
            Ok(Some(entry)) => {
                debug!(
                    cached = ?entry.source_fingerprint,
                    current = ?fingerprint,
                    "Cached reference is stale"
                );
                Ok(CachedReference::Stale)
            }
            Ok(None) => Ok(CachedReference::Missing),
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Unreadable cache record, recomputing");
                Ok(CachedReference::Missing)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn normalize(&self, raw: Vec<u8>, role: ImageRole) -> Result<NormalizedImage, VerifyError> {
        let normalizer: ImageNormalizer = self.config.normalizer;
        tokio::task::spawn_blocking(move || normalizer.normalize(&raw))
            .await
            .map_err(|e| VerifyError::Internal {
                reason: format!("normalization task failed: {e}"),
            })?
            .map_err(|source| VerifyError::ImageDecode { role, source })
    }

    async fn extract(
        &self,
        image: &NormalizedImage,
        role: ImageRole,
        subject_id: &str,
    ) -> Result<Embedding, VerifyError> {
        let timeout = self.config.provider_timeout;
        let timeout_ms = timeout.as_millis() as u64;

        let faces = match tokio::time::timeout(timeout, self.provider.extract(image)).await {
            Err(_) => return Err(VerifyError::ProviderTimeout { timeout_ms }),
            Ok(Err(e)) if e.is_timeout() => return Err(VerifyError::ProviderTimeout { timeout_ms }),
            Ok(Err(e)) => {
                return Err(VerifyError::ProviderError {
                    reason: e.to_string(),
                });
            }
            Ok(Ok(faces)) => faces,
        };

        let embedding = self
            .config
            .face_policy
            .select(faces)
            .map_err(|e| match (e, role) {
                (FaceSelectionError::NoFace, ImageRole::Probe) => VerifyError::NoFaceInProbe,
                (FaceSelectionError::NoFace, ImageRole::Reference) => {
                    VerifyError::NoFaceInReference {
                        subject_id: subject_id.to_string(),
                    }
                }
                (FaceSelectionError::MultipleFaces { count }, role) => {
                    VerifyError::MultipleFaces { role, count }
                }
            })?;

        embedding
            .validate(self.provider.dimension())
            .map_err(|e| VerifyError::ProviderError {
                reason: e.to_string(),
            })?;
        Ok(embedding)
    }
}

fn map_asset_error(err: AssetError) -> VerifyError {
    match err {
        AssetError::EmptySubjectId | AssetError::InvalidSubjectId { .. } => {
            VerifyError::invalid_request(err.to_string())
        }
        AssetError::NotFound { subject_id } => VerifyError::SubjectNotFound { subject_id },
        AssetError::Read { .. } => VerifyError::Internal {
            reason: err.to_string(),
        },
    }
}
