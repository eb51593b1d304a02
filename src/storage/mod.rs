//! Persistent storage for cached embeddings.
//!
//! One `rkyv` record per subject, written via temp-file + rename and read back
//! through a read-only memory map.

pub mod disk;
pub mod error;
pub mod manifest;
pub mod mmap;
mod model;

pub use disk::{DiskStore, RECORD_EXTENSION};
pub use error::{StorageError, StorageResult};
pub use manifest::{CacheManifest, MANIFEST_FILENAME};
pub use model::{ArchivedCacheEntry, CACHE_FORMAT_VERSION, CacheEntry};
