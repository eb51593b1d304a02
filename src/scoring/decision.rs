use tracing::debug;

use super::error::ScoringError;
use super::types::{Decision, MatchOperator};

pub const DEFAULT_THRESHOLD: f64 = 0.65;

/// L2 norm of `a - b`.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64, ScoringError> {
    if a.len() != b.len() {
        return Err(ScoringError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        .sqrt())
}

pub fn decide(
    a: &[f64],
    b: &[f64],
    threshold: f64,
    operator: MatchOperator,
) -> Result<Decision, ScoringError> {
    let distance = euclidean_distance(a, b)?;
    Ok(Decision {
        distance,
        matched: operator.accepts(distance, threshold),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionEngine {
    threshold: f64,
    operator: MatchOperator,
}

impl DecisionEngine {
    pub fn new(threshold: f64, operator: MatchOperator) -> Result<Self, ScoringError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ScoringError::InvalidThreshold {
                value: threshold,
                reason: "must be a finite positive number".to_string(),
            });
        }
        Ok(Self {
            threshold,
            operator,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn operator(&self) -> MatchOperator {
        self.operator
    }

    pub fn decide(&self, reference: &[f64], probe: &[f64]) -> Result<Decision, ScoringError> {
        let decision = decide(reference, probe, self.threshold, self.operator)?;
        debug!(
            distance = decision.distance,
            threshold = self.threshold,
            operator = self.operator.symbol(),
            matched = decision.matched,
            "Decision computed"
        );
        Ok(decision)
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            operator: MatchOperator::default(),
        }
    }
}
