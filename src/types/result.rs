//! Scoring result data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version tag of the scoring logic.
///
/// Bump whenever weights, thresholds or feature derivation change.
pub const MODEL_VERSION: &str = "v1.0.2-hybrid";

/// Categorical decision for a scored transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Flag,
    Block,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Flag => "FLAG",
            Decision::Block => "BLOCK",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags for the signals that contributed to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskFactor {
    /// Supervised classifier scored above its pattern-match threshold
    #[serde(rename = "XGB_PATTERN_MATCH")]
    XgbPatternMatch,
    /// Anomaly detector marked the transaction as an outlier
    #[serde(rename = "ANOMALY_DETECTED_ISO_FOREST")]
    AnomalyDetected,
}

impl RiskFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFactor::XgbPatternMatch => "XGB_PATTERN_MATCH",
            RiskFactor::AnomalyDetected => "ANOMALY_DETECTED_ISO_FOREST",
        }
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final output of the engine for one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskResult {
    /// Risk score, always within 0..=100
    pub score: u8,
    pub decision: Decision,
    /// Factors in the order they fired
    pub factors: Vec<RiskFactor>,
    pub model_version: String,
}

impl RiskResult {
    pub fn new(score: u8, decision: Decision, factors: Vec<RiskFactor>) -> Self {
        Self {
            score,
            decision,
            factors,
            model_version: MODEL_VERSION.to_string(),
        }
    }
}
