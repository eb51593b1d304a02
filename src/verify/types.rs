use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::cache::CacheStatus;
use crate::embedding::FacePolicy;
use crate::normalize::ImageNormalizer;
use crate::scoring::{DEFAULT_THRESHOLD, DecisionReason, MatchOperator};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Which side of a comparison an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Probe,
    Reference,
}

impl ImageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::Probe => "probe",
            ImageRole::Reference => "reference",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one successful verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub subject_id: String,
    pub matched: bool,
    pub distance: f64,
    pub threshold: f64,
    pub operator: MatchOperator,
    pub reason: DecisionReason,
    pub cache: CacheStatus,
}

impl VerificationResult {
    pub fn message(&self) -> &'static str {
        self.reason.message()
    }
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub threshold: f64,
    pub operator: MatchOperator,
    pub face_policy: FacePolicy,
    pub provider_timeout: Duration,
    /// Fail the request instead of degrading when the reference embedding
    /// cannot be persisted.
    pub require_persistence: bool,
    pub normalizer: ImageNormalizer,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            operator: MatchOperator::default(),
            face_policy: FacePolicy::default(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            require_persistence: false,
            normalizer: ImageNormalizer::default(),
        }
    }
}
