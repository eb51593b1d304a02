//! Enrolled-image lookup.
//!
//! [`AssetResolver`] maps a subject id to the bytes of its reference image and
//! to a [`Fingerprint`] used for cache staleness checks.

pub mod error;


pub use error::{AssetError, AssetResult};

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::hashing::{Fingerprint, fingerprint_content, fingerprint_metadata};

/// Enrolled image bytes together with the fingerprint of those same bytes.
#[derive(Debug, Clone)]
pub struct EnrolledImage {
    pub bytes: Vec<u8>,
    /// `None` when the image changed while it was being read.
    pub fingerprint: Option<Fingerprint>,
}

/// Resolves subject ids to enrolled images.
pub trait AssetResolver: Send + Sync {
    /// Returns the enrolled image bytes.
    fn resolve(&self, subject_id: &str) -> AssetResult<Vec<u8>>;

    /// Returns the current fingerprint of the enrolled image.
    fn fingerprint(&self, subject_id: &str) -> AssetResult<Fingerprint>;

    /// Reads the enrolled image once and fingerprints what was read.
    ///
    /// The default hashes the returned bytes, which matches resolvers whose
    /// [`fingerprint`](Self::fingerprint) is a content hash.
    fn load(&self, subject_id: &str) -> AssetResult<EnrolledImage> {
        let bytes = self.resolve(subject_id)?;
        Ok(EnrolledImage {
            fingerprint: Some(fingerprint_content(&bytes)),
            bytes,
        })
    }

    /// Returns `true` if the backing store is reachable.
    fn is_ready(&self) -> bool {
        true
    }
}

/// How the filesystem resolver fingerprints files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintMode {
    /// BLAKE3 of the file contents.
    #[default]
    Content,
    /// BLAKE3 of (length, mtime).
    Metadata,
}

impl FromStr for FingerprintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(FingerprintMode::Content),
            "metadata" | "mtime" => Ok(FingerprintMode::Metadata),
            other => Err(format!(
                "unknown fingerprint mode '{other}' (expected 'content' or 'metadata')"
            )),
        }
    }
}

impl fmt::Display for FingerprintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintMode::Content => f.write_str("content"),
            FingerprintMode::Metadata => f.write_str("metadata"),
        }
    }
}

/// Enrolled images stored as `<root>/<subject_id>`.
#[derive(Debug, Clone)]
pub struct FilesystemAssetResolver {
    root: PathBuf,
    mode: FingerprintMode,
}

impl FilesystemAssetResolver {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            mode: FingerprintMode::default(),
        }
    }

    pub fn with_fingerprint_mode(mut self, mode: FingerprintMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fingerprint_mode(&self) -> FingerprintMode {
        self.mode
    }

    /// Maps a subject id to a path under the root, refusing anything that is
    /// not a single plain file name.
    pub fn subject_path(&self, subject_id: &str) -> AssetResult<PathBuf> {
        validate_subject_id(subject_id)?;
        Ok(self.root.join(subject_id))
    }

    fn read_error(&self, subject_id: &str, path: PathBuf, source: std::io::Error) -> AssetError {
        if source.kind() == ErrorKind::NotFound {
            AssetError::NotFound {
                subject_id: subject_id.to_string(),
            }
        } else {
            AssetError::Read { path, source }
        }
    }
}

impl AssetResolver for FilesystemAssetResolver {
    fn resolve(&self, subject_id: &str) -> AssetResult<Vec<u8>> {
        let path = self.subject_path(subject_id)?;
        if path.is_dir() {
            return Err(AssetError::NotFound {
                subject_id: subject_id.to_string(),
            });
        }
        fs::read(&path).map_err(|e| self.read_error(subject_id, path, e))
    }

    fn fingerprint(&self, subject_id: &str) -> AssetResult<Fingerprint> {
        match self.mode {
            FingerprintMode::Content => self.resolve(subject_id).map(|b| fingerprint_content(&b)),
            FingerprintMode::Metadata => {
                let path = self.subject_path(subject_id)?;
                let meta = fs::metadata(&path)
                    .map_err(|e| self.read_error(subject_id, path.clone(), e))?;
                if !meta.is_file() {
                    return Err(AssetError::NotFound {
                        subject_id: subject_id.to_string(),
                    });
                }
                let modified = meta
                    .modified()
                    .map_err(|source| AssetError::Read { path, source })?;
                Ok(fingerprint_metadata(meta.len(), modified))
            }
        }
    }

    fn load(&self, subject_id: &str) -> AssetResult<EnrolledImage> {
        match self.mode {
            FingerprintMode::Content => {
                let bytes = self.resolve(subject_id)?;
                Ok(EnrolledImage {
                    fingerprint: Some(fingerprint_content(&bytes)),
                    bytes,
                })
            }
            FingerprintMode::Metadata => {
                // Metadata cannot be derived from the bytes; bracket the read instead.
                let before = self.fingerprint(subject_id)?;
                let bytes = self.resolve(subject_id)?;
                let after = self.fingerprint(subject_id)?;
                Ok(EnrolledImage {
                    bytes,
                    fingerprint: (before == after).then_some(before),
                })
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.root.is_dir()
    }
}

/// Rejects ids that are empty or could escape the asset root.
pub fn validate_subject_id(subject_id: &str) -> AssetResult<()> {
    if subject_id.is_empty() {
        return Err(AssetError::EmptySubjectId);
    }

    let invalid = |reason: &str| AssetError::InvalidSubjectId {
        subject_id: subject_id.to_string(),
        reason: reason.to_string(),
    };

    if subject_id.contains('\0') {
        return Err(invalid("contains NUL byte"));
    }
    if subject_id.contains('/') || subject_id.contains('\\') {
        return Err(invalid("must not contain path separators"));
    }

    let mut components = Path::new(subject_id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("must be a plain file name")),
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockAssetResolver;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use std::collections::HashMap;
    use std::sync::Arc;

    use parking_lot::RwLock;

    use super::{AssetError, AssetResolver, AssetResult, validate_subject_id};
    use crate::hashing::{Fingerprint, fingerprint_content};

    /// In-memory resolver; enrolled images can be swapped at runtime.
    #[derive(Debug, Clone, Default)]
    pub struct MockAssetResolver {
        images: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    }

    impl MockAssetResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, subject_id: &str, bytes: Vec<u8>) {
            self.images.write().insert(subject_id.to_string(), bytes);
        }

        pub fn remove(&self, subject_id: &str) {
            self.images.write().remove(subject_id);
        }
    }

    impl AssetResolver for MockAssetResolver {
        fn resolve(&self, subject_id: &str) -> AssetResult<Vec<u8>> {
            validate_subject_id(subject_id)?;
            self.images
                .read()
                .get(subject_id)
                .cloned()
                .ok_or_else(|| AssetError::NotFound {
                    subject_id: subject_id.to_string(),
                })
        }

        fn fingerprint(&self, subject_id: &str) -> AssetResult<Fingerprint> {
            self.resolve(subject_id).map(|b| fingerprint_content(&b))
        }
    }
}
