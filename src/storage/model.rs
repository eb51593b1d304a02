//! Storage model types.

use rkyv::{Archive, Deserialize, Serialize};

use crate::hashing::Fingerprint;

/// Bumped whenever the archived layout of [`CacheEntry`] changes.
pub const CACHE_FORMAT_VERSION: u16 = 1;

/// Cached reference embedding persisted to disk.
///
/// Stored as `rkyv` bytes and read back through a memory map.
///
/// # Example
/// ```rust
/// use facegate::CacheEntry;
/// use facegate::hashing::fingerprint_content;
///
/// let entry = CacheEntry::new(
///     "alice.jpg",
///     "stub-thumbnail-v1",
///     vec![0.0; 128],
///     fingerprint_content(b"alice"),
///     0,
/// );
/// assert_eq!(entry.dimension(), 128);
/// ```
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct CacheEntry {
    /// Layout version, see [`CACHE_FORMAT_VERSION`].
    pub format_version: u16,
    /// Subject the embedding belongs to.
    pub subject_id: String,
    /// Model id of the provider that produced the embedding.
    pub provider: String,
    /// Embedding components.
    pub embedding: Vec<f64>,
    /// Fingerprint of the enrolled image at extraction time.
    pub source_fingerprint: Fingerprint,
    /// Unix timestamp (milliseconds) when the entry was written.
    pub created_at: i64,
}

impl CacheEntry {
    pub fn new(
        subject_id: &str,
        provider: &str,
        embedding: Vec<f64>,
        source_fingerprint: Fingerprint,
        created_at: i64,
    ) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            subject_id: subject_id.to_string(),
            provider: provider.to_string(),
            embedding,
            source_fingerprint,
            created_at,
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }

    /// Returns `true` if the entry was computed from an image with `fingerprint`.
    #[inline]
    pub fn is_fresh(&self, fingerprint: &Fingerprint) -> bool {
        self.source_fingerprint == *fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::fingerprint_content;
    use rkyv::rancor::Error;
    use rkyv::{access, from_bytes, to_bytes};

    fn create_test_entry() -> CacheEntry {
        CacheEntry::new(
            "alice.jpg",
            "mock-v1",
            vec![0.25, -0.5, 1.0e-3, 42.0],
            fingerprint_content(b"alice"),
            1_702_500_000_000,
        )
    }

    #[test]
    fn test_new_sets_current_format_version() {
        let entry = create_test_entry();
        assert_eq!(entry.format_version, CACHE_FORMAT_VERSION);
        assert_eq!(entry.dimension(), 4);
    }

    #[test]
    fn test_is_fresh() {
        let entry = create_test_entry();
        assert!(entry.is_fresh(&fingerprint_content(b"alice")));
        assert!(!entry.is_fresh(&fingerprint_content(b"alice-v2")));
    }

    #[test]
    fn test_serialization_preserves_embedding_bits() {
        let original = create_test_entry();
        let bytes = to_bytes::<Error>(&original).expect("serialization should succeed");
        let restored = from_bytes::<CacheEntry, Error>(&bytes).expect("deserialization");

        assert_eq!(original, restored);
        for (a, b) in original.embedding.iter().zip(&restored.embedding) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_archived_access_without_deserializing() {
        let original = create_test_entry();
        let bytes = to_bytes::<Error>(&original).unwrap();
        let archived = access::<ArchivedCacheEntry, Error>(&bytes).unwrap();

        assert_eq!(archived.subject_id.as_str(), "alice.jpg");
        assert_eq!(archived.provider.as_str(), "mock-v1");
        assert_eq!(archived.embedding.len(), 4);
    }

    #[test]
    fn test_truncated_bytes_fail_validation() {
        let bytes = to_bytes::<Error>(&create_test_entry()).unwrap();
        let truncated = &bytes[..8];
        assert!(access::<ArchivedCacheEntry, Error>(truncated).is_err());
    }
}
