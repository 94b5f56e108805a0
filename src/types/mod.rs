//! Type definitions for the risk engine

pub mod assessment;
pub mod result;
pub mod transaction;

pub use assessment::{RejectedTransaction, RiskAssessment};
pub use result::{Decision, RiskFactor, RiskResult, MODEL_VERSION};
pub use transaction::Transaction;
