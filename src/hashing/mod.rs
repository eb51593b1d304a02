//! BLAKE3 helpers for cache keys and source fingerprints.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use blake3::Hasher;
use rkyv::{Archive, Deserialize, Serialize};

/// Content token used to detect whether a cached embedding is stale.
///
/// Always 32 bytes; how it is derived (content or metadata) is up to the
/// [`AssetResolver`](crate::assets::AssetResolver) that produced it.
#[derive(Archive, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Wraps raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form (64 chars).
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is enough to tell records apart in logs.
        write!(f, "Fingerprint({}…)", &self.to_hex()[..12])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[inline]
pub fn fingerprint_content(bytes: &[u8]) -> Fingerprint {
    Fingerprint(*blake3::hash(bytes).as_bytes())
}

/// Fingerprint derived from file length and modification time.
///
/// Cheaper than hashing the content, but a same-size rewrite within the
/// filesystem's mtime granularity goes unnoticed.
pub fn fingerprint_metadata(len: u64, modified: SystemTime) -> Fingerprint {
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut hasher = Hasher::new();
    hasher.update(b"meta|");
    hasher.update(&len.to_le_bytes());
    hasher.update(b"|");
    hasher.update(&nanos.to_le_bytes());
    Fingerprint(*hasher.finalize().as_bytes())
}

/// Stable on-disk key for a subject id (hex BLAKE3 of the id).
///
/// Subject ids are opaque strings; hashing keeps file names safe regardless
/// of what characters the id contains.
#[inline]
pub fn subject_key(subject_id: &str) -> String {
    blake3::hash(subject_id.as_bytes()).to_hex().to_string()
}
