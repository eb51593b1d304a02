use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::{CacheError, CacheResult, EmbeddingCache, SubjectLockGuard, SubjectLocks};
use crate::embedding::Embedding;
use crate::hashing::Fingerprint;
use crate::storage::{CacheEntry, StorageError};

/// In-memory cache with switchable write failures.
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    locks: SubjectLocks,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
    provider: Arc<str>,
}

impl MockEmbeddingCache {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: Arc::from(provider),
            ..Self::default()
        }
    }

    /// Makes every subsequent `store` fail with a write error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Places an entry directly, bypassing `store`.
    pub fn insert(&self, entry: CacheEntry) {
        self.entries.write().insert(entry.subject_id.clone(), entry);
    }

    pub fn get(&self, subject_id: &str) -> Option<CacheEntry> {
        self.entries.read().get(subject_id).cloned()
    }
}

impl EmbeddingCache for MockEmbeddingCache {
    async fn lookup(&self, subject_id: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self.get(subject_id))
    }

    async fn store(
        &self,
        subject_id: &str,
        embedding: &Embedding,
        fingerprint: Fingerprint,
    ) -> CacheResult<CacheEntry> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Storage(StorageError::WriteFailed {
                path: subject_id.into(),
                reason: "mock write failure".to_string(),
            }));
        }

        if let Some(existing) = self.get(subject_id)
            && existing.is_fresh(&fingerprint)
            && existing.embedding.as_slice() == embedding.as_slice()
        {
            return Ok(existing);
        }

        let entry = CacheEntry::new(
            subject_id,
            &self.provider,
            embedding.to_vec(),
            fingerprint,
            chrono::Utc::now().timestamp_millis(),
        );
        self.insert(entry.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(entry)
    }

    async fn invalidate(&self, subject_id: &str) -> CacheResult<bool> {
        Ok(self.entries.write().remove(subject_id).is_some())
    }

    async fn lock_subject(&self, subject_id: &str) -> SubjectLockGuard {
        self.locks.acquire(subject_id).await
    }

    fn len(&self) -> CacheResult<usize> {
        Ok(self.entries.read().len())
    }
}
