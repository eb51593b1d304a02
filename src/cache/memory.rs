//! Bounded in-memory tier in front of the disk store.

use moka::sync::Cache;

use crate::storage::CacheEntry;

/// Subject id → entry, evicted by moka's TinyLFU once `capacity` is reached.
#[derive(Clone)]
pub struct MemoryTier {
    entries: Cache<String, CacheEntry>,
}

impl MemoryTier {
    pub const DEFAULT_CAPACITY: u64 = 10_000;

    /// Returns `None` for a zero capacity, which disables the tier.
    pub fn with_capacity(capacity: u64) -> Option<Self> {
        (capacity > 0).then(|| Self {
            entries: Cache::builder().max_capacity(capacity).build(),
        })
    }

    #[inline]
    pub fn get(&self, subject_id: &str) -> Option<CacheEntry> {
        self.entries.get(subject_id)
    }

    #[inline]
    pub fn insert(&self, entry: CacheEntry) {
        self.entries.insert(entry.subject_id.clone(), entry);
    }

    #[inline]
    pub fn remove(&self, subject_id: &str) -> Option<CacheEntry> {
        self.entries.remove(subject_id)
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs pending eviction work so `len` is exact.
    #[inline]
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }
}

impl std::fmt::Debug for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
