use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::assets::{FilesystemAssetResolver, MockAssetResolver};
use crate::cache::{FACEGATE_STATUS_HEADER, MockEmbeddingCache};
use crate::embedding::MockEmbeddingProvider;
use crate::gateway::error::status_for;
use crate::gateway::{HandlerState, create_router_with_state};
use crate::verify::{ImageRole, Verifier, VerifierConfig, VerifyError};

const BOUNDARY: &str = "facegate-test-boundary";
const DIM: usize = 4;
const ALICE: [u8; 3] = [200, 10, 10];
const ALICE_PROBE: [u8; 3] = [190, 20, 20];
const STRANGER: [u8; 3] = [10, 10, 200];
const FACELESS: [u8; 3] = [128, 128, 128];
const MAX_UPLOAD: usize = 64 * 1024;

struct TestApp {
    router: Router,
    provider: MockEmbeddingProvider,
    cache: MockEmbeddingCache,
}

fn png(color: [u8; 3]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb(color)))
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode test image");
    buf.into_inner()
}

fn test_app_with(config: VerifierConfig, provider: MockEmbeddingProvider) -> TestApp {
    provider.register(ALICE, vec![vec![0.0; DIM]]);
    provider.register(ALICE_PROBE, vec![vec![0.3, 0.0, 0.0, 0.0]]);
    provider.register(STRANGER, vec![vec![0.0, 0.9, 0.0, 0.0]]);

    let resolver = MockAssetResolver::new();
    resolver.insert("alice.jpg", png(ALICE));
    let cache = MockEmbeddingCache::new(MockEmbeddingProvider::MODEL_ID);

    let verifier = Verifier::new(provider.clone(), resolver, cache.clone(), config).unwrap();
    let state = HandlerState::new(Arc::new(verifier)).with_embedder_mode("mock");

    TestApp {
        router: create_router_with_state(state, MAX_UPLOAD),
        provider,
        cache,
    }
}

fn test_app() -> TestApp {
    test_app_with(VerifierConfig::default(), MockEmbeddingProvider::new(DIM))
}

fn multipart_body(image: Option<&[u8]>, subject: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(subject) = subject {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"user_image_name\"\r\n\r\n{subject}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(image) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"probe.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn verify_request(path: &str, image: Option<&[u8]>, subject: Option<&str>) -> Request<Body> {
    let body = multipart_body(image, subject);
    Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let header = response
        .headers()
        .get(FACEGATE_STATUS_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, header, body)
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).expect("JSON body")
}

#[tokio::test]
async fn test_root_banner() {
    let app = test_app();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Face Recognition API is running!");
}

#[tokio::test]
async fn test_healthz() {
    let app = test_app();
    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();

    let (status, header, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header.as_deref(), Some("healthy"));
    assert_eq!(json(&body)["status"], "ok");
}

#[tokio::test]
async fn test_ready_with_mocks() {
    let app = test_app();
    let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();

    let (status, header, body) = send(&app.router, request).await;
    let body = json(&body);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header.as_deref(), Some("ready"));
    assert_eq!(body["components"]["embedder_mode"], "mock");
    assert_eq!(body["components"]["embedder_model"], "mock-v1");
    assert_eq!(body["components"]["cached_subjects"], 0);
}

#[tokio::test]
async fn test_ready_reports_missing_assets_dir() {
    let dir = TempDir::new().unwrap();
    let resolver = FilesystemAssetResolver::new(dir.path().join("missing"));
    let verifier = Verifier::new(
        MockEmbeddingProvider::new(DIM),
        resolver,
        MockEmbeddingCache::new("mock-v1"),
        VerifierConfig::default(),
    )
    .unwrap();
    let router = create_router_with_state(HandlerState::new(Arc::new(verifier)), MAX_UPLOAD);

    let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();
    let (status, header, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(header.as_deref(), Some("not_ready"));
    assert_eq!(json(&body)["components"]["assets"], "not_ready");
}

#[tokio::test]
async fn test_verify_match() {
    let app = test_app();
    let probe = png(ALICE_PROBE);

    let (status, header, body) = send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("alice.jpg")),
    )
    .await;
    let body = json(&body);

    assert_eq!(status, StatusCode::OK);
    assert_eq!(header.as_deref(), Some("match"));
    assert_eq!(body["match"], true);
    assert_eq!(body["tolerance"], 0.65);
    assert_eq!(body["operator"], "strict");
    assert_eq!(body["cache"], "miss");
    assert_eq!(body["message"], "Face matched");
    assert!((body["distance"].as_f64().unwrap() - 0.3).abs() < 1e-9);
}

#[tokio::test]
async fn test_verify_alias_route_and_cache_hit() {
    let app = test_app();
    let probe = png(ALICE_PROBE);

    send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("alice.jpg")),
    )
    .await;
    let (status, _, body) = send(
        &app.router,
        verify_request("/verify-face", Some(&probe), Some("alice.jpg")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["cache"], "hit");
    assert_eq!(app.provider.calls_for(ALICE), 1);
}

#[tokio::test]
async fn test_verify_no_match_is_ok() {
    let app = test_app();
    let probe = png(STRANGER);

    let (status, header, body) = send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("alice.jpg")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(header.as_deref(), Some("no_match"));
    assert_eq!(json(&body)["match"], false);
}

#[tokio::test]
async fn test_verify_missing_fields() {
    let app = test_app();
    let probe = png(ALICE_PROBE);

    for request in [
        verify_request("/face-verify", Some(&probe), None),
        verify_request("/face-verify", None, Some("alice.jpg")),
        verify_request("/face-verify", Some(&probe), Some("   ")),
        verify_request("/face-verify", Some(&b""[..]), Some("alice.jpg")),
    ] {
        let (status, header, body) = send(&app.router, request).await;
        let body = json(&body);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(header.as_deref(), Some("invalid_request"));
        assert_eq!(body["match"], false);
        assert_eq!(body["error"], "invalid_request");
    }
}

#[tokio::test]
async fn test_verify_not_multipart() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/face-verify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["match"], false);
}

#[tokio::test]
async fn test_verify_unknown_subject() {
    let app = test_app();
    let probe = png(ALICE_PROBE);

    let (status, header, _) = send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("nobody.jpg")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(header.as_deref(), Some("subject_not_found"));
}

#[tokio::test]
async fn test_verify_corrupt_image_is_client_error() {
    let app = test_app();

    let (status, header, body) = send(
        &app.router,
        verify_request("/face-verify", Some(&b"GIF89a-not-really"[..]), Some("alice.jpg")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(header.as_deref(), Some("image_decode_error"));
    assert_eq!(json(&body)["error"], "image_decode_error");
}

#[tokio::test]
async fn test_verify_no_face_in_probe() {
    let app = test_app();
    let probe = png(FACELESS);

    let (status, header, _) = send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("alice.jpg")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(header.as_deref(), Some("no_face_in_probe"));
    assert_eq!(app.cache.writes(), 0);
}

#[tokio::test]
async fn test_verify_provider_failure_is_bad_gateway() {
    let app = test_app();
    app.provider.fail_requests(true);
    let probe = png(ALICE_PROBE);

    let (status, header, _) = send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("alice.jpg")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(header.as_deref(), Some("provider_error"));
}

#[tokio::test]
async fn test_verify_provider_timeout() {
    let config = VerifierConfig {
        provider_timeout: Duration::from_millis(10),
        ..VerifierConfig::default()
    };
    let app = test_app_with(
        config,
        MockEmbeddingProvider::new(DIM).with_delay(Duration::from_millis(300)),
    );
    let probe = png(ALICE_PROBE);

    let (status, header, _) = send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("alice.jpg")),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(header.as_deref(), Some("provider_timeout"));
}

#[tokio::test]
async fn test_verify_required_persistence_failure() {
    let config = VerifierConfig {
        require_persistence: true,
        ..VerifierConfig::default()
    };
    let app = test_app_with(config, MockEmbeddingProvider::new(DIM));
    app.cache.fail_writes(true);
    let probe = png(ALICE_PROBE);

    let (status, header, _) = send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("alice.jpg")),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some("cache_error"));
}

#[tokio::test]
async fn test_verify_degraded_cache_still_answers() {
    let app = test_app();
    app.cache.fail_writes(true);
    let probe = png(ALICE_PROBE);

    let (status, _, body) = send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("alice.jpg")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["cache"], "degraded");
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = test_app();
    let huge = vec![0u8; MAX_UPLOAD + 1024];

    let (status, _, _) = send(
        &app.router,
        verify_request("/face-verify", Some(&huge), Some("alice.jpg")),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_evict_subject() {
    let app = test_app();
    let probe = png(ALICE_PROBE);
    send(
        &app.router,
        verify_request("/face-verify", Some(&probe), Some("alice.jpg")),
    )
    .await;

    let evict = || {
        Request::builder()
            .method("DELETE")
            .uri("/v1/subjects/alice.jpg/embedding")
            .body(Body::empty())
            .unwrap()
    };

    let (status, header, body) = send(&app.router, evict()).await;
    let body = json(&body);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header.as_deref(), Some("evicted"));
    assert_eq!(body["subject_id"], "alice.jpg");
    assert_eq!(body["evicted"], true);

    let (_, _, body) = send(&app.router, evict()).await;
    assert_eq!(json(&body)["evicted"], false);
}

#[test]
fn test_status_mapping_is_total() {
    let cases = [
        (VerifyError::NoFaceInProbe, StatusCode::BAD_REQUEST),
        (
            VerifyError::NoFaceInReference {
                subject_id: "a".into(),
            },
            StatusCode::BAD_REQUEST,
        ),
        (
            VerifyError::MultipleFaces {
                role: ImageRole::Reference,
                count: 3,
            },
            StatusCode::BAD_REQUEST,
        ),
        (
            VerifyError::SubjectNotFound {
                subject_id: "a".into(),
            },
            StatusCode::NOT_FOUND,
        ),
        (
            VerifyError::ProviderError {
                reason: "down".into(),
            },
            StatusCode::BAD_GATEWAY,
        ),
        (
            VerifyError::ProviderTimeout { timeout_ms: 5 },
            StatusCode::GATEWAY_TIMEOUT,
        ),
        (
            VerifyError::DimensionMismatch {
                reference: 128,
                probe: 4,
            },
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            VerifyError::Internal {
                reason: "io".into(),
            },
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, expected) in cases {
        assert_eq!(status_for(&err), expected, "{}", err.kind());
        assert_eq!(err.is_client_error(), expected.is_client_error());
    }
}
