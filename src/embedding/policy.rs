use std::fmt;
use std::str::FromStr;

use crate::embedding::types::Embedding;

/// How a single face is chosen from a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacePolicy {
    /// Take the first (highest-confidence) face; ignore the rest.
    #[default]
    FirstDetected,
    /// Refuse images with more than one detected face.
    RejectMultiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceSelectionError {
    NoFace,
    MultipleFaces { count: usize },
}

impl FacePolicy {
    pub fn select(&self, faces: Vec<Embedding>) -> Result<Embedding, FaceSelectionError> {
        let count = faces.len();
        match (self, count) {
            (_, 0) => Err(FaceSelectionError::NoFace),
            (FacePolicy::RejectMultiple, n) if n > 1 => {
                Err(FaceSelectionError::MultipleFaces { count: n })
            }
            _ => faces
                .into_iter()
                .next()
                .ok_or(FaceSelectionError::NoFace),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacePolicy::FirstDetected => "first",
            FacePolicy::RejectMultiple => "reject-multiple",
        }
    }
}

impl fmt::Display for FacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first-detected" => Ok(FacePolicy::FirstDetected),
            "reject-multiple" | "single" => Ok(FacePolicy::RejectMultiple),
            other => Err(format!(
                "unknown face policy '{other}' (expected 'first' or 'reject-multiple')"
            )),
        }
    }
}
