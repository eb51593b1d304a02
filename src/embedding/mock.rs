//! Scripted provider for tests.
//!
//! Faces are registered per colour of the top-left pixel, which lets tests
//! build distinct "people" from solid-colour images.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::embedding::error::EmbeddingError;
use crate::embedding::provider::EmbeddingProvider;
use crate::embedding::types::Embedding;
use crate::normalize::NormalizedImage;

#[derive(Debug, Default)]
struct MockState {
    faces: HashMap<[u8; 3], Vec<Embedding>>,
    calls_by_color: HashMap<[u8; 3], usize>,
    fail_with_request_error: bool,
}

#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    model_id: String,
    dimension: usize,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
    calls: Arc<AtomicUsize>,
}

impl MockEmbeddingProvider {
    pub const MODEL_ID: &'static str = "mock-v1";

    pub fn new(dimension: usize) -> Self {
        Self {
            model_id: Self::MODEL_ID.to_string(),
            dimension,
            delay: None,
            state: Arc::new(Mutex::new(MockState::default())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_model_id(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    /// Sleeps this long inside every `extract` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Registers the faces returned for images whose top-left pixel is `color`.
    pub fn register(&self, color: [u8; 3], faces: Vec<Vec<f64>>) {
        self.state
            .lock()
            .faces
            .insert(color, faces.into_iter().map(Embedding::new).collect());
    }

    /// Makes every subsequent call fail with a request error.
    pub fn fail_requests(&self, fail: bool) {
        self.state.lock().fail_with_request_error = fail;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, color: [u8; 3]) -> usize {
        self.state
            .lock()
            .calls_by_color
            .get(&color)
            .copied()
            .unwrap_or(0)
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn extract(&self, image: &NormalizedImage) -> Result<Vec<Embedding>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let color = image.pixels().get_pixel(0, 0).0;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        *state.calls_by_color.entry(color).or_insert(0) += 1;

        if state.fail_with_request_error {
            return Err(EmbeddingError::RequestFailed {
                reason: "mock provider failure".to_string(),
            });
        }

        Ok(state.faces.get(&color).cloned().unwrap_or_default())
    }
}
