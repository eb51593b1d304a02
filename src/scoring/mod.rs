//! Distance and threshold decision between two embeddings.
//!
//! [`decide`] is pure: Euclidean distance of the element-wise difference,
//! compared against a threshold with a configurable [`MatchOperator`].
//! [`DecisionEngine`] bundles a validated threshold and operator.

pub mod decision;
pub mod error;
pub mod types;


pub use decision::{DEFAULT_THRESHOLD, DecisionEngine, decide, euclidean_distance};
pub use error::ScoringError;
pub use types::{Decision, DecisionReason, MatchOperator};
