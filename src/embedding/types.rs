use std::sync::Arc;

use crate::embedding::error::EmbeddingError;

/// Fixed-length face feature vector.
///
/// Immutable once built; clones share the same allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Arc<[f64]>);

impl Embedding {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values.into())
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    /// Checks length and that every component is finite.
    pub fn validate(&self, expected_dim: usize) -> Result<(), EmbeddingError> {
        if self.len() != expected_dim {
            return Err(EmbeddingError::InvalidEmbedding {
                reason: format!(
                    "expected {} values, found {}",
                    expected_dim,
                    self.len()
                ),
            });
        }
        if let Some(index) = self.0.iter().position(|v| !v.is_finite()) {
            return Err(EmbeddingError::InvalidEmbedding {
                reason: format!("non-finite value at index {index}"),
            });
        }
        Ok(())
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<&[f64]> for Embedding {
    fn from(values: &[f64]) -> Self {
        Self(values.into())
    }
}

impl AsRef<[f64]> for Embedding {
    fn as_ref(&self) -> &[f64] {
        self.as_slice()
    }
}
