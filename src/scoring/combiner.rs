//! Score combination for the two-model ensemble

use crate::models::predictor::AnomalyVerdict;
use crate::types::result::RiskFactor;

/// Weight applied to the supervised score (0-100), in tenths.
pub const SUPERVISED_WEIGHT_TENTHS: i64 = 7;

/// Supervised scores above this add `XGB_PATTERN_MATCH`.
pub const PATTERN_MATCH_THRESHOLD: i64 = 70;

/// Contribution used when the supervised model is not loaded, in tenths.
pub const SUPERVISED_FALLBACK_TENTHS: i64 = 100;

/// Penalty added when the anomaly detector flags an outlier, in tenths.
pub const ANOMALY_PENALTY_TENTHS: i64 = 300;

/// Unclamped output of the combiner
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedScore {
    /// Not clamped; the decision policy owns the 0-100 range.
    /// Always a whole number of tenths, so `.5` ties are exact.
    pub raw_score: f64,
    pub factors: Vec<RiskFactor>,
}

/// Merges the supervised probability and the anomaly verdict into one
/// raw risk score.
///
/// The supervised classifier is the primary signal (70% weight); the
/// anomaly detector adds a fixed boost for patterns the classifier was
/// never trained on.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleCombiner;

impl EnsembleCombiner {
    pub fn new() -> Self {
        Self
    }

    /// Combine the predictor outputs. `None` means the predictor is unavailable.
    pub fn combine(
        &self,
        supervised: Option<f64>,
        anomaly: Option<AnomalyVerdict>,
    ) -> CombinedScore {
        // Summed in tenths: 45 * 0.7 in f64 lands just below 31.5
        let mut tenths: i64 = 0;
        let mut factors = Vec::new();

        match supervised {
            Some(probability) => {
                let supervised_score = Self::supervised_score(probability);
                tenths += supervised_score * SUPERVISED_WEIGHT_TENTHS;
                if supervised_score > PATTERN_MATCH_THRESHOLD {
                    factors.push(RiskFactor::XgbPatternMatch);
                }
            }
            None => tenths += SUPERVISED_FALLBACK_TENTHS,
        }

        match anomaly {
            Some(AnomalyVerdict::Anomalous) => {
                tenths += ANOMALY_PENALTY_TENTHS;
                factors.push(RiskFactor::AnomalyDetected);
            }
            Some(AnomalyVerdict::Normal) | None => {}
        }

        CombinedScore {
            raw_score: tenths as f64 / 10.0,
            factors,
        }
    }

    /// Probability scaled to an integer 0-100.
    pub fn supervised_score(probability: f64) -> i64 {
        (probability.clamp(0.0, 1.0) * 100.0).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::decision::DecisionPolicy;

    #[test]
    fn test_both_unavailable() {
        let combined = EnsembleCombiner::new().combine(None, None);
        assert_eq!(combined.raw_score, 10.0);
        assert!(combined.factors.is_empty());
    }

    #[test]
    fn test_strong_match_and_anomaly() {
        let combined = EnsembleCombiner::new().combine(Some(0.95), Some(AnomalyVerdict::Anomalous));

        assert!((combined.raw_score - 96.5).abs() < 1e-9);
        assert_eq!(
            combined.factors,
            vec![RiskFactor::XgbPatternMatch, RiskFactor::AnomalyDetected]
        );
    }

    #[test]
    fn test_moderate_probability_normal() {
        let combined = EnsembleCombiner::new().combine(Some(0.50), Some(AnomalyVerdict::Normal));
        assert!((combined.raw_score - 35.0).abs() < 1e-9);
        assert!(combined.factors.is_empty());
    }

    #[test]
    fn test_pattern_match_threshold_is_exclusive() {
        let combiner = EnsembleCombiner::new();
        assert!(combiner.combine(Some(0.70), None).factors.is_empty());
        assert_eq!(
            combiner.combine(Some(0.71), None).factors,
            vec![RiskFactor::XgbPatternMatch]
        );
    }

    #[test]
    fn test_anomaly_without_supervised_uses_fallback() {
        let combined = EnsembleCombiner::new().combine(None, Some(AnomalyVerdict::Anomalous));
        assert_eq!(combined.raw_score, 40.0);
        assert_eq!(combined.factors, vec![RiskFactor::AnomalyDetected]);
    }

    #[test]
    fn test_maximum_raw_score() {
        let combined = EnsembleCombiner::new().combine(Some(1.0), Some(AnomalyVerdict::Anomalous));
        assert!((combined.raw_score - 100.0).abs() < 1e-9);

        // Out-of-range probabilities are pinned before scaling
        assert_eq!(EnsembleCombiner::supervised_score(1.4), 100);
        assert_eq!(EnsembleCombiner::supervised_score(-0.2), 0);
    }

    #[test]
    fn test_half_points_round_up_for_every_supervised_score() {
        let combiner = EnsembleCombiner::new();
        let policy = DecisionPolicy::new();

        for xgb in 0..=100_i64 {
            let probability = xgb as f64 / 100.0;
            assert_eq!(EnsembleCombiner::supervised_score(probability), xgb);

            for verdict in [None, Some(AnomalyVerdict::Normal), Some(AnomalyVerdict::Anomalous)] {
                let penalty = if verdict == Some(AnomalyVerdict::Anomalous) { 300 } else { 0 };
                let expected = ((xgb * 7 + penalty + 5) / 10).min(100) as u8;

                let combined = combiner.combine(Some(probability), verdict);
                let (score, _) = policy.decide(combined.raw_score);
                assert_eq!(score, expected, "xgb={} verdict={:?}", xgb, verdict);
            }
        }

        // 0.45 -> 31.5 and 0.85 -> 59.5 both round up
        assert_eq!(policy.decide(combiner.combine(Some(0.45), None).raw_score).0, 32);
        assert_eq!(policy.decide(combiner.combine(Some(0.85), None).raw_score).0, 60);
    }

    #[test]
    fn test_supervised_score_rounds() {
        assert_eq!(EnsembleCombiner::supervised_score(0.954), 95);
        assert_eq!(EnsembleCombiner::supervised_score(0.956), 96);
        assert_eq!(EnsembleCombiner::supervised_score(0.0), 0);
    }
}
