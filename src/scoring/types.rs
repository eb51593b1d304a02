use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Comparison applied between distance and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    /// `distance < threshold`
    #[default]
    Strict,
    /// `distance <= threshold`
    Inclusive,
}

impl MatchOperator {
    #[inline]
    pub fn accepts(&self, distance: f64, threshold: f64) -> bool {
        match self {
            MatchOperator::Strict => distance < threshold,
            MatchOperator::Inclusive => distance <= threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOperator::Strict => "strict",
            MatchOperator::Inclusive => "inclusive",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            MatchOperator::Strict => "<",
            MatchOperator::Inclusive => "<=",
        }
    }
}

impl FromStr for MatchOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "<" | "lt" => Ok(MatchOperator::Strict),
            "inclusive" | "<=" | "le" => Ok(MatchOperator::Inclusive),
            other => Err(format!(
                "unknown match operator '{other}' (expected 'strict' or 'inclusive')"
            )),
        }
    }
}

impl fmt::Display for MatchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    WithinThreshold,
    BeyondThreshold,
}

impl DecisionReason {
    pub fn message(&self) -> &'static str {
        match self {
            DecisionReason::WithinThreshold => "Face matched",
            DecisionReason::BeyondThreshold => "Face does not match",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub distance: f64,
    pub matched: bool,
}

impl Decision {
    pub fn reason(&self) -> DecisionReason {
        if self.matched {
            DecisionReason::WithinThreshold
        } else {
            DecisionReason::BeyondThreshold
        }
    }
}
