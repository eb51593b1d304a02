//! Embedding cache for enrolled subjects.
//!
//! [`DiskEmbeddingCache`] persists one record per subject through
//! [`crate::storage::DiskStore`] and keeps recently used entries in a bounded
//! [`MemoryTier`]. Freshness is judged by the caller against the entry's
//! `source_fingerprint`.

pub mod error;
pub mod locks;
pub mod memory;
pub mod types;

#[cfg(any(test, feature = "mock"))]
mod mock;

pub use error::{CacheError, CacheResult};
pub use locks::{SubjectLockGuard, SubjectLocks};
pub use memory::MemoryTier;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbeddingCache;
pub use types::{
    CacheStatus, FACEGATE_STATUS_EVICTED, FACEGATE_STATUS_HEADER, FACEGATE_STATUS_HEALTHY,
    FACEGATE_STATUS_MATCH, FACEGATE_STATUS_NO_MATCH, FACEGATE_STATUS_NOT_READY,
    FACEGATE_STATUS_READY,
};

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use tracing::{debug, info, instrument, warn};

use crate::embedding::Embedding;
use crate::hashing::Fingerprint;
use crate::storage::{CacheEntry, CacheManifest, DiskStore, StorageError};

/// Store of reference embeddings keyed by subject id.
pub trait EmbeddingCache: Send + Sync {
    /// Returns the cached entry for `subject_id`, if any.
    fn lookup(
        &self,
        subject_id: &str,
    ) -> impl Future<Output = CacheResult<Option<CacheEntry>>> + Send;

    /// Upserts the entry for `subject_id`. Storing an identical embedding and
    /// fingerprint again leaves the existing entry untouched.
    fn store(
        &self,
        subject_id: &str,
        embedding: &Embedding,
        fingerprint: Fingerprint,
    ) -> impl Future<Output = CacheResult<CacheEntry>> + Send;

    /// Removes the entry for `subject_id`. Returns `true` if one existed.
    fn invalidate(&self, subject_id: &str) -> impl Future<Output = CacheResult<bool>> + Send;

    /// Takes the per-subject write lock.
    fn lock_subject(&self, subject_id: &str) -> impl Future<Output = SubjectLockGuard> + Send;

    /// Number of persisted entries.
    fn len(&self) -> CacheResult<usize>;

    fn is_ready(&self) -> bool {
        true
    }
}

/// Disk-backed cache with an optional in-memory tier.
#[derive(Debug, Clone)]
pub struct DiskEmbeddingCache {
    disk: DiskStore,
    memory: Option<MemoryTier>,
    locks: SubjectLocks,
    manifest: CacheManifest,
    /// Bumped by every `store` and `invalidate` while it updates the memory
    /// tier. A disk fill only publishes to memory if no bump happened during
    /// its read.
    epoch: Arc<Mutex<u64>>,
}

impl DiskEmbeddingCache {
    /// Opens (or initialises) the cache directory for `provider`.
    ///
    /// Refuses a directory whose manifest names another provider or
    /// dimension. A `memory_capacity` of zero disables the memory tier.
    pub fn open(
        root: PathBuf,
        provider: &str,
        dimension: usize,
        memory_capacity: u64,
    ) -> CacheResult<Self> {
        let disk = DiskStore::new(root);
        disk.ensure_root()?;
        let manifest = CacheManifest::open_or_create(disk.root(), provider, dimension)?;

        info!(
            path = %disk.root().display(),
            provider = %manifest.provider,
            dimension = manifest.dimension,
            memory_capacity,
            "Embedding cache opened"
        );

        Ok(Self {
            disk,
            memory: MemoryTier::with_capacity(memory_capacity),
            locks: SubjectLocks::new(),
            manifest,
            epoch: Arc::new(Mutex::new(0)),
        })
    }

    pub fn provider(&self) -> &str {
        &self.manifest.provider
    }

    pub fn dimension(&self) -> usize {
        self.manifest.dimension
    }

    pub fn disk(&self) -> &DiskStore {
        &self.disk
    }

    pub fn memory(&self) -> Option<&MemoryTier> {
        self.memory.as_ref()
    }

    fn check_provider(&self, entry: &CacheEntry) -> CacheResult<()> {
        if entry.provider != self.manifest.provider {
            return Err(CacheError::ProviderMismatch {
                subject_id: entry.subject_id.clone(),
                expected: self.manifest.provider.clone(),
                found: entry.provider.clone(),
            });
        }
        if entry.dimension() != self.manifest.dimension {
            return Err(CacheError::Corrupt {
                subject_id: entry.subject_id.clone(),
                reason: format!(
                    "record holds {} dimensions, expected {}",
                    entry.dimension(),
                    self.manifest.dimension
                ),
            });
        }
        Ok(())
    }

    async fn load_from_disk(&self, subject_id: &str) -> CacheResult<Option<CacheEntry>> {
        let disk = self.disk.clone();
        let key = subject_id.to_string();
        let loaded = tokio::task::spawn_blocking(move || disk.load(&key))
            .await
            .map_err(|e| CacheError::Background {
                reason: e.to_string(),
            })?;

        match loaded {
            Ok(entry) => Ok(entry),
            Err(StorageError::Corrupt { reason, .. }) => Err(CacheError::Corrupt {
                subject_id: subject_id.to_string(),
                reason,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl EmbeddingCache for DiskEmbeddingCache {
    #[instrument(skip(self))]
    async fn lookup(&self, subject_id: &str) -> CacheResult<Option<CacheEntry>> {
        if let Some(entry) = self.memory.as_ref().and_then(|m| m.get(subject_id)) {
            debug!("Memory tier hit");
            return Ok(Some(entry));
        }

        let epoch = *self.epoch.lock();
        let Some(entry) = self.load_from_disk(subject_id).await? else {
            debug!("No cached record");
            return Ok(None);
        };

        self.check_provider(&entry)?;
        if let Some(memory) = &self.memory {
            let current = self.epoch.lock();
            if *current == epoch {
                memory.insert(entry.clone());
            } else {
                debug!("Cache changed during disk read, skipping memory fill");
            }
        }
        debug!("Disk hit");
        Ok(Some(entry))
    }

    #[instrument(skip(self, embedding, fingerprint), fields(dimension = embedding.len()))]
    async fn store(
        &self,
        subject_id: &str,
        embedding: &Embedding,
        fingerprint: Fingerprint,
    ) -> CacheResult<CacheEntry> {
        if embedding.len() != self.manifest.dimension {
            return Err(CacheError::DimensionMismatch {
                expected: self.manifest.dimension,
                actual: embedding.len(),
            });
        }

        let existing = match self.lookup(subject_id).await {
            Ok(existing) => existing,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Overwriting unreadable record");
                None
            }
            Err(e) => return Err(e),
        };
        if let Some(existing) = existing
            && existing.is_fresh(&fingerprint)
            && existing.embedding.as_slice() == embedding.as_slice()
        {
            debug!("Identical entry already stored");
            return Ok(existing);
        }

        let entry = CacheEntry::new(
            subject_id,
            &self.manifest.provider,
            embedding.to_vec(),
            fingerprint,
            chrono::Utc::now().timestamp_millis(),
        );

        let disk = self.disk.clone();
        let record = entry.clone();
        tokio::task::spawn_blocking(move || disk.store(&record))
            .await
            .map_err(|e| CacheError::Background {
                reason: e.to_string(),
            })??;

        {
            let mut epoch = self.epoch.lock();
            *epoch = epoch.wrapping_add(1);
            if let Some(memory) = &self.memory {
                memory.insert(entry.clone());
            }
        }
        info!("Reference embedding stored");
        Ok(entry)
    }

    #[instrument(skip(self))]
    async fn invalidate(&self, subject_id: &str) -> CacheResult<bool> {
        let disk = self.disk.clone();
        let key = subject_id.to_string();
        let removed = tokio::task::spawn_blocking(move || disk.delete(&key))
            .await
            .map_err(|e| CacheError::Background {
                reason: e.to_string(),
            })??;

        let cached = {
            let mut epoch = self.epoch.lock();
            *epoch = epoch.wrapping_add(1);
            self.memory
                .as_ref()
                .and_then(|m| m.remove(subject_id))
                .is_some()
        };

        if removed || cached {
            info!("Cache entry invalidated");
        }
        Ok(removed || cached)
    }

    async fn lock_subject(&self, subject_id: &str) -> SubjectLockGuard {
        self.locks.acquire(subject_id).await
    }

    fn len(&self) -> CacheResult<usize> {
        Ok(self.disk.count()?)
    }

    fn is_ready(&self) -> bool {
        self.disk.root().is_dir()
    }
}
