//! Threshold decision policy

use crate::types::result::Decision;

/// Scores above this are blocked.
pub const BLOCK_ABOVE: u8 = 85;

/// Scores above this (and not blocked) are flagged for review.
pub const FLAG_ABOVE: u8 = 65;

/// Maps a raw risk score to a bounded integer score and a decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionPolicy;

impl DecisionPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Round, then clamp into `0..=100`, then classify.
    pub fn decide(&self, raw_score: f64) -> (u8, Decision) {
        let score = Self::clamp_score(raw_score);
        (score, Self::classify(score))
    }

    pub fn clamp_score(raw_score: f64) -> u8 {
        if raw_score.is_nan() {
            return 0;
        }
        raw_score.round().clamp(0.0, 100.0) as u8
    }

    pub fn classify(score: u8) -> Decision {
        if score > BLOCK_ABOVE {
            Decision::Block
        } else if score > FLAG_ABOVE {
            Decision::Flag
        } else {
            Decision::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(DecisionPolicy::classify(100), Decision::Block);
        assert_eq!(DecisionPolicy::classify(86), Decision::Block);
        assert_eq!(DecisionPolicy::classify(85), Decision::Flag);
        assert_eq!(DecisionPolicy::classify(66), Decision::Flag);
        assert_eq!(DecisionPolicy::classify(65), Decision::Allow);
        assert_eq!(DecisionPolicy::classify(0), Decision::Allow);
    }

    #[test]
    fn test_round_then_clamp() {
        let policy = DecisionPolicy::new();

        assert_eq!(policy.decide(96.5), (97, Decision::Block));
        assert_eq!(policy.decide(35.0), (35, Decision::Allow));
        assert_eq!(policy.decide(85.4), (85, Decision::Flag));
        assert_eq!(policy.decide(85.5), (86, Decision::Block));
        assert_eq!(policy.decide(65.49), (65, Decision::Allow));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let policy = DecisionPolicy::new();

        assert_eq!(policy.decide(250.0), (100, Decision::Block));
        assert_eq!(policy.decide(-12.0), (0, Decision::Allow));
        assert_eq!(policy.decide(f64::INFINITY), (100, Decision::Block));
        assert_eq!(policy.decide(f64::NAN), (0, Decision::Allow));
    }

    #[test]
    fn test_decision_is_function_of_score() {
        let policy = DecisionPolicy::new();
        for raw in 0..=100 {
            let (score, decision) = policy.decide(raw as f64);
            assert_eq!(score, raw as u8);
            assert_eq!(decision, DecisionPolicy::classify(score));
        }
    }
}
