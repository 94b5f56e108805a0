//! Global threat level derived from recent scoring outcomes.
//!
//! Only scores and decisions are aggregated, never transaction details.

use crate::types::result::Decision;
use serde::{Deserialize, Serialize};

/// Weight kept by the moving average on each update
const AVERAGE_DECAY: f64 = 0.9;

const HIGH_RISK_RATIO: f64 = 0.3;
const HIGH_AVG_SCORE: f64 = 60.0;
const MEDIUM_RISK_RATIO: f64 = 0.1;
const MEDIUM_AVG_SCORE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Cumulative outcome statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalThreatStats {
    pub total_transactions: u64,
    pub flagged_count: u64,
    pub blocked_count: u64,
    /// Exponential moving average of batch mean scores
    pub average_risk_score: f64,
    pub threat_level: ThreatLevel,
}

/// Folds batches of (score, decision) into [`GlobalThreatStats`].
#[derive(Debug, Default)]
pub struct ThreatMonitor {
    stats: GlobalThreatStats,
}

impl ThreatMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one batch. The threat level reacts to the batch alone,
    /// so a burst of risky traffic shows up immediately.
    pub fn update(&mut self, batch: &[(u8, Decision)]) -> &GlobalThreatStats {
        if batch.is_empty() {
            return &self.stats;
        }

        let total = batch.len() as f64;
        let score_sum: f64 = batch.iter().map(|(score, _)| *score as f64).sum();
        let flagged = batch.iter().filter(|(_, d)| *d == Decision::Flag).count() as u64;
        let blocked = batch.iter().filter(|(_, d)| *d == Decision::Block).count() as u64;

        self.stats.total_transactions += batch.len() as u64;
        self.stats.flagged_count += flagged;
        self.stats.blocked_count += blocked;

        let batch_avg = score_sum / total;
        self.stats.average_risk_score =
            self.stats.average_risk_score * AVERAGE_DECAY + batch_avg * (1.0 - AVERAGE_DECAY);

        let risky_ratio = (flagged + blocked) as f64 / total;
        self.stats.threat_level = if risky_ratio > HIGH_RISK_RATIO || batch_avg > HIGH_AVG_SCORE {
            ThreatLevel::High
        } else if risky_ratio > MEDIUM_RISK_RATIO || batch_avg > MEDIUM_AVG_SCORE {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        };

        &self.stats
    }

    pub fn stats(&self) -> &GlobalThreatStats {
        &self.stats
    }
}
