//! End-to-end verification against the filesystem resolver and disk cache.

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use common::{
    ALICE, ALICE_PROBE, ALICE_RETAKE, DIM, Dirs, STRANGER, disk_verifier, mock_provider, png,
};
use facegate::cache::{CacheError, CacheStatus, DiskEmbeddingCache, EmbeddingCache};
use facegate::embedding::MockEmbeddingProvider;
use facegate::storage::StorageError;
use facegate::verify::VerifyError;

#[tokio::test]
async fn test_match_then_cache_hit() {
    let dirs = Dirs::new();
    dirs.enroll("alice.jpg", ALICE);
    let provider = mock_provider();
    let verifier = disk_verifier(&dirs, provider.clone(), 100);

    let first = verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();
    assert!(first.matched);
    assert_eq!(first.cache, CacheStatus::Miss);
    assert!((first.distance - 0.3).abs() < 1e-9);

    let second = verifier.verify(&png(STRANGER), "alice.jpg").await.unwrap();
    assert!(!second.matched);
    assert_eq!(second.cache, CacheStatus::Hit);
    assert_eq!(provider.calls_for(ALICE), 1);
}

#[tokio::test]
async fn test_embedding_survives_restart() {
    let dirs = Dirs::new();
    dirs.enroll("alice.jpg", ALICE);

    {
        let verifier = disk_verifier(&dirs, mock_provider(), 100);
        verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();
    }

    let provider = mock_provider();
    let restarted = disk_verifier(&dirs, provider.clone(), 100);
    let result = restarted
        .verify(&png(ALICE_PROBE), "alice.jpg")
        .await
        .unwrap();

    assert_eq!(result.cache, CacheStatus::Hit);
    assert_eq!(provider.calls_for(ALICE), 0);
    assert_eq!(provider.calls_for(ALICE_PROBE), 1);
}

#[tokio::test]
async fn test_replaced_enrollment_is_detected_on_disk() {
    let dirs = Dirs::new();
    dirs.enroll("alice.jpg", ALICE);
    let provider = mock_provider();
    let verifier = disk_verifier(&dirs, provider.clone(), 100);

    let before = verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();
    dirs.enroll("alice.jpg", ALICE_RETAKE);
    let after = verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();

    assert_eq!(after.cache, CacheStatus::Stale);
    assert!(after.distance > before.distance);
    assert_eq!(provider.calls_for(ALICE_RETAKE), 1);

    let again = verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();
    assert_eq!(again.cache, CacheStatus::Hit);
}

#[tokio::test]
async fn test_corrupt_record_is_recomputed() {
    let dirs = Dirs::new();
    dirs.enroll("alice.jpg", ALICE);
    let provider = mock_provider();
    let verifier = disk_verifier(&dirs, provider.clone(), 0);

    verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();
    let record = verifier.cache().disk().entry_path("alice.jpg");
    fs::write(&record, b"definitely not an archived entry").unwrap();

    let result = verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();
    assert!(result.matched);
    assert_eq!(result.cache, CacheStatus::Miss);
    assert_eq!(provider.calls_for(ALICE), 2);

    let repaired = verifier.cache().disk().load("alice.jpg").unwrap().unwrap();
    assert_eq!(repaired.dimension(), DIM);
}

#[tokio::test]
async fn test_cache_dir_bound_to_provider() {
    let dirs = Dirs::new();
    DiskEmbeddingCache::open(dirs.cache.clone(), MockEmbeddingProvider::MODEL_ID, DIM, 0).unwrap();

    let err = DiskEmbeddingCache::open(dirs.cache.clone(), "another-model", DIM, 0).unwrap_err();
    assert!(matches!(
        err,
        CacheError::Storage(StorageError::ManifestMismatch { .. })
    ));

    let err = DiskEmbeddingCache::open(dirs.cache.clone(), MockEmbeddingProvider::MODEL_ID, 512, 0)
        .unwrap_err();
    assert!(matches!(
        err,
        CacheError::Storage(StorageError::ManifestMismatch { .. })
    ));
}

#[tokio::test]
async fn test_unusable_cache_dir_degrades() {
    let dirs = Dirs::new();
    dirs.enroll("alice.jpg", ALICE);
    let verifier = disk_verifier(&dirs, mock_provider(), 100);

    fs::remove_dir_all(&dirs.cache).unwrap();
    fs::write(&dirs.cache, b"not a directory").unwrap();

    let result = verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();
    assert!(result.matched);
    assert_eq!(result.cache, CacheStatus::Degraded);
}

#[tokio::test]
async fn test_unusual_subject_ids_map_to_safe_records() {
    let dirs = Dirs::new();
    let subject = "José María (2).png";
    dirs.enroll(subject, ALICE);
    let verifier = disk_verifier(&dirs, mock_provider(), 0);

    verifier.verify(&png(ALICE_PROBE), subject).await.unwrap();

    let record = verifier.cache().disk().entry_path(subject);
    let name = record.file_name().unwrap().to_str().unwrap();
    assert!(name.ends_with(".rkyv"));
    assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.'));
    assert!(record.exists());
}

#[tokio::test]
async fn test_path_traversal_is_rejected() {
    let dirs = Dirs::new();
    dirs.enroll("alice.jpg", ALICE);
    let verifier = disk_verifier(&dirs, mock_provider(), 0);

    let err = verifier
        .verify(&png(ALICE_PROBE), "../assets/alice.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_evict_removes_persisted_record() {
    let dirs = Dirs::new();
    dirs.enroll("alice.jpg", ALICE);
    let provider = mock_provider();
    let verifier = disk_verifier(&dirs, provider.clone(), 100);

    verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();
    assert_eq!(verifier.cache().len().unwrap(), 1);

    assert!(verifier.evict("alice.jpg").await.unwrap());
    assert_eq!(verifier.cache().len().unwrap(), 0);

    let result = verifier.verify(&png(ALICE_PROBE), "alice.jpg").await.unwrap();
    assert_eq!(result.cache, CacheStatus::Miss);
    assert_eq!(provider.calls_for(ALICE), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_verifications_share_one_extraction() {
    let dirs = Dirs::new();
    dirs.enroll("alice.jpg", ALICE);
    let provider = mock_provider().with_delay(Duration::from_millis(50));
    let verifier = Arc::new(disk_verifier(&dirs, provider.clone(), 100));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            tokio::spawn(async move { verifier.verify(&png(ALICE_PROBE), "alice.jpg").await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert!(result.unwrap().unwrap().matched);
    }
    assert_eq!(provider.calls_for(ALICE), 1);
    assert_eq!(provider.calls_for(ALICE_PROBE), 8);
}
