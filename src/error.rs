//! Error types for the scoring engine

use thiserror::Error;

/// Errors raised by the scoring engine and its predictors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed transaction or feature vector. Never coerced.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A loaded predictor failed while running.
    #[error("{model} inference failed: {reason}")]
    Inference { model: String, reason: String },
}

impl EngineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn inference(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Inference {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
