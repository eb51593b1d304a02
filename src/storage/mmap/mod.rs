//! Read-only memory maps over complete cache records.
//!
//! Records are only ever replaced by rename, so a mapping always sees one
//! whole file: the old inode stays mapped even if a writer swaps it out.

pub mod error;

pub use error::{MmapError, MmapResult};

use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use rkyv::Portable;
use rkyv::api::high::{HighValidator, access};
use rkyv::bytecheck::CheckBytes;
use rkyv::rancor::Error as RkyvError;

pub const RKYV_ALIGNMENT: usize = 16;

#[derive(Clone)]
pub struct MmapFileHandle {
    inner: Arc<Mmap>,
    path: Arc<PathBuf>,
}

impl std::fmt::Debug for MmapFileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapFileHandle")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish()
    }
}

impl MmapFileHandle {
    pub fn open<P: AsRef<Path>>(path: P) -> MmapResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let metadata = file.metadata()?;
        if metadata.len() == 0 {
            return Err(MmapError::EmptyRecord);
        }

        // SAFETY: Records are never written in place; writers rename a new
        // file over the old path, leaving this mapping's inode untouched.
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self {
            inner: Arc::new(mmap),
            path: Arc::new(path.to_path_buf()),
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        self.inner.deref()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validates and returns the archived root at the start of the mapping.
    pub fn access_archived<T>(&self) -> MmapResult<&T>
    where
        T: Portable + for<'a> CheckBytes<HighValidator<'a, RkyvError>>,
    {
        let data = self.as_slice();
        if data.is_empty() {
            return Err(MmapError::EmptyRecord);
        }
        if !(data.as_ptr() as usize).is_multiple_of(RKYV_ALIGNMENT) {
            return Err(MmapError::Misaligned {
                alignment: RKYV_ALIGNMENT,
            });
        }

        access::<T, RkyvError>(data).map_err(|e| MmapError::InvalidArchive(e.to_string()))
    }
}
