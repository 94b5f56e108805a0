//! Hybrid scoring: ensemble combination, decision policy and the engine
//! that ties them to the predictors.

pub mod combiner;
pub mod decision;
pub mod engine;

pub use combiner::{CombinedScore, EnsembleCombiner};
pub use decision::DecisionPolicy;
pub use engine::{RiskEngine, ScoreOutcome};
