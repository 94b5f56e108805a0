//! Predictor capabilities and their availability state.
//!
//! The supervised classifier and the anomaly detector produce differently
//! shaped outputs and are combined by different rules, so each gets its own
//! trait.

use crate::error::{EngineError, EngineResult};
use crate::feature_extractor::ensure_feature_len;
use serde::{Deserialize, Serialize};

/// A fitted classifier returning the probability of the fraud class.
pub trait SupervisedPredictor: Send + Sync {
    /// Fraud probability in `[0, 1]` for a feature vector of the model's width
    fn fraud_probability(&self, features: &[f64]) -> EngineResult<f64>;

    fn name(&self) -> &str;
}

/// A fitted outlier detector returning a binary verdict.
pub trait AnomalyPredictor: Send + Sync {
    fn verdict(&self, features: &[f64]) -> EngineResult<AnomalyVerdict>;

    fn name(&self) -> &str;
}

/// Output of the anomaly detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyVerdict {
    Anomalous,
    Normal,
}

impl AnomalyVerdict {
    /// Map an isolation-forest label (`-1` outlier, `1` inlier).
    pub fn from_label(label: i64) -> Self {
        if label < 0 {
            AnomalyVerdict::Anomalous
        } else {
            AnomalyVerdict::Normal
        }
    }
}

/// Whether a predictor was loaded at startup. Fixed for the process lifetime.
pub enum PredictorState<P> {
    Loaded(P),
    Unavailable,
}

impl<P> PredictorState<P> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, PredictorState::Loaded(_))
    }
}

impl<P> From<Option<P>> for PredictorState<P> {
    fn from(predictor: Option<P>) -> Self {
        match predictor {
            Some(p) => PredictorState::Loaded(p),
            None => PredictorState::Unavailable,
        }
    }
}

pub type SupervisedState = PredictorState<Box<dyn SupervisedPredictor>>;
pub type AnomalyState = PredictorState<Box<dyn AnomalyPredictor>>;

impl PredictorState<Box<dyn SupervisedPredictor>> {
    /// Run the classifier if loaded. `Ok(None)` means unavailable.
    ///
    /// A non-finite probability is an inference failure, not a score.
    pub fn score(&self, features: &[f64]) -> EngineResult<Option<f64>> {
        ensure_feature_len(features)?;
        match self {
            PredictorState::Loaded(model) => {
                let probability = model.fraud_probability(features)?;
                if !probability.is_finite() {
                    return Err(EngineError::inference(
                        model.name(),
                        format!("non-finite probability {}", probability),
                    ));
                }
                Ok(Some(probability))
            }
            PredictorState::Unavailable => Ok(None),
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        match self {
            PredictorState::Loaded(model) => Some(model.name()),
            PredictorState::Unavailable => None,
        }
    }
}

impl PredictorState<Box<dyn AnomalyPredictor>> {
    /// Run the detector if loaded. `Ok(None)` means unavailable.
    pub fn score(&self, features: &[f64]) -> EngineResult<Option<AnomalyVerdict>> {
        ensure_feature_len(features)?;
        match self {
            PredictorState::Loaded(model) => model.verdict(features).map(Some),
            PredictorState::Unavailable => Ok(None),
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        match self {
            PredictorState::Loaded(model) => Some(model.name()),
            PredictorState::Unavailable => None,
        }
    }
}
