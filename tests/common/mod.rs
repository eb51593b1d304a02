//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::Path;

use facegate::assets::FilesystemAssetResolver;
use facegate::cache::DiskEmbeddingCache;
use facegate::embedding::MockEmbeddingProvider;
use facegate::verify::{Verifier, VerifierConfig};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

pub const DIM: usize = 4;

/// Top-left pixel colours the mock provider keys faces on.
pub const ALICE: [u8; 3] = [200, 10, 10];
pub const ALICE_RETAKE: [u8; 3] = [180, 40, 40];
pub const ALICE_PROBE: [u8; 3] = [190, 20, 20];
pub const STRANGER: [u8; 3] = [10, 10, 200];

pub type DiskVerifier =
    Verifier<MockEmbeddingProvider, FilesystemAssetResolver, DiskEmbeddingCache>;

pub fn png(color: [u8; 3]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb(color)))
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode test image");
    buf.into_inner()
}

pub fn mock_provider() -> MockEmbeddingProvider {
    let provider = MockEmbeddingProvider::new(DIM);
    provider.register(ALICE, vec![vec![0.0, 0.0, 0.0, 0.0]]);
    provider.register(ALICE_RETAKE, vec![vec![0.0, 0.0, 0.5, 0.0]]);
    provider.register(ALICE_PROBE, vec![vec![0.3, 0.0, 0.0, 0.0]]);
    provider.register(STRANGER, vec![vec![0.0, 0.9, 0.0, 0.0]]);
    provider
}

/// Temporary `assets/` and `cache/` directories.
pub struct Dirs {
    _root: TempDir,
    pub assets: std::path::PathBuf,
    pub cache: std::path::PathBuf,
}

impl Dirs {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let assets = root.path().join("assets");
        let cache = root.path().join("cache");
        fs::create_dir_all(&assets).expect("create assets dir");
        Self {
            _root: root,
            assets,
            cache,
        }
    }

    pub fn enroll(&self, subject_id: &str, color: [u8; 3]) {
        write_image(&self.assets.join(subject_id), color);
    }
}

pub fn write_image(path: &Path, color: [u8; 3]) {
    fs::write(path, png(color)).expect("write enrolled image");
}

pub fn open_cache(dirs: &Dirs, memory_capacity: u64) -> DiskEmbeddingCache {
    DiskEmbeddingCache::open(
        dirs.cache.clone(),
        MockEmbeddingProvider::MODEL_ID,
        DIM,
        memory_capacity,
    )
    .expect("open cache")
}

pub fn disk_verifier(
    dirs: &Dirs,
    provider: MockEmbeddingProvider,
    memory_capacity: u64,
) -> DiskVerifier {
    Verifier::new(
        provider,
        FilesystemAssetResolver::new(dirs.assets.clone()),
        open_cache(dirs, memory_capacity),
        VerifierConfig::default(),
    )
    .expect("valid verifier config")
}
