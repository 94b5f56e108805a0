//! Hybrid risk scoring engine

use crate::config::AppConfig;
use crate::error::{EngineError, EngineResult};
use crate::feature_extractor::{ensure_feature_len, ensure_finite_features, FeatureExtractor};
use crate::health::HealthStatus;
use crate::models::loader::ModelLoader;
use crate::models::predictor::{AnomalyState, AnomalyVerdict, SupervisedState};
use crate::scoring::combiner::EnsembleCombiner;
use crate::scoring::decision::DecisionPolicy;
use crate::signals;
use crate::types::result::RiskResult;
use crate::types::transaction::Transaction;
use anyhow::Result;
use tracing::{debug, info, warn};

/// A scored transaction plus how it was scored.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub result: RiskResult,
    /// A predictor was unavailable or failed, so a fallback path was used
    pub degraded: bool,
}

/// Scores transactions with a supervised classifier and an anomaly
/// detector, either of which may be unavailable.
///
/// Holds no mutable state; share it behind an `Arc` across workers.
pub struct RiskEngine {
    extractor: FeatureExtractor,
    supervised: SupervisedState,
    anomaly: AnomalyState,
    combiner: EnsembleCombiner,
    policy: DecisionPolicy,
}

impl RiskEngine {
    pub fn new(extractor: FeatureExtractor, supervised: SupervisedState, anomaly: AnomalyState) -> Self {
        Self {
            extractor,
            supervised,
            anomaly,
            combiner: EnsembleCombiner::new(),
            policy: DecisionPolicy::new(),
        }
    }

    /// Load predictors and the signal source described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.models.onnx_threads)?;
        let (supervised, anomaly) = loader.load_predictors(&config.models);
        let extractor = FeatureExtractor::new(signals::from_config(&config.signals));

        let engine = Self::new(extractor, supervised, anomaly);
        if engine.is_ready() {
            info!(signal_source = engine.extractor.signal_source(), "Risk engine ready");
        } else {
            warn!(
                supervised_loaded = engine.supervised.is_loaded(),
                anomaly_loaded = engine.anomaly.is_loaded(),
                signal_source = engine.extractor.signal_source(),
                "Risk engine starting in degraded mode"
            );
        }
        Ok(engine)
    }

    /// Score a transaction. Only malformed input is an error.
    pub fn score(&self, tx: &Transaction) -> EngineResult<RiskResult> {
        self.evaluate(tx).map(|outcome| outcome.result)
    }

    /// Score a prebuilt feature vector.
    pub fn score_features(&self, features: &[f64]) -> EngineResult<RiskResult> {
        self.evaluate_features(features).map(|outcome| outcome.result)
    }

    /// Like [`score`](Self::score), also reporting whether a fallback was used.
    pub fn evaluate(&self, tx: &Transaction) -> EngineResult<ScoreOutcome> {
        tx.validate()?;
        let features = self.extractor.extract(tx);
        self.evaluate_features(features.as_slice())
    }

    pub fn evaluate_features(&self, features: &[f64]) -> EngineResult<ScoreOutcome> {
        ensure_feature_len(features)?;
        ensure_finite_features(features)?;

        let supervised = self.supervised_output(features)?;
        let anomaly = self.anomaly_output(features)?;
        let degraded = supervised.is_none() || anomaly.is_none();

        let combined = self.combiner.combine(supervised, anomaly);
        let (score, decision) = self.policy.decide(combined.raw_score);

        debug!(
            raw_score = combined.raw_score,
            score = score,
            decision = %decision,
            factors = ?combined.factors,
            degraded = degraded,
            "Transaction scored"
        );

        Ok(ScoreOutcome {
            result: RiskResult::new(score, decision, combined.factors),
            degraded,
        })
    }

    /// True when both predictors are loaded.
    pub fn is_ready(&self) -> bool {
        self.supervised.is_loaded() && self.anomaly.is_loaded()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::new(self.supervised.is_loaded(), self.anomaly.is_loaded())
    }

    pub fn feature_extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    fn supervised_output(&self, features: &[f64]) -> EngineResult<Option<f64>> {
        match self.supervised.score(features) {
            Err(EngineError::Inference { model, reason }) => {
                warn!(model = %model, error = %reason, "Supervised inference failed, using fallback");
                Ok(None)
            }
            other => other,
        }
    }

    fn anomaly_output(&self, features: &[f64]) -> EngineResult<Option<AnomalyVerdict>> {
        match self.anomaly.score(features) {
            Err(EngineError::Inference { model, reason }) => {
                warn!(model = %model, error = %reason, "Anomaly inference failed, skipping");
                Ok(None)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::predictor::{AnomalyPredictor, PredictorState, SupervisedPredictor};
    use crate::signals::{FixedSignals, RandomSignals};
    use crate::types::result::{Decision, RiskFactor, MODEL_VERSION};

    struct StubClassifier(f64);

    impl SupervisedPredictor for StubClassifier {
        fn fraud_probability(&self, _features: &[f64]) -> EngineResult<f64> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "stub-classifier"
        }
    }

    struct StubDetector(AnomalyVerdict);

    impl AnomalyPredictor for StubDetector {
        fn verdict(&self, _features: &[f64]) -> EngineResult<AnomalyVerdict> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "stub-detector"
        }
    }

    struct BrokenClassifier;

    impl SupervisedPredictor for BrokenClassifier {
        fn fraud_probability(&self, _features: &[f64]) -> EngineResult<f64> {
            Err(EngineError::inference("broken", "session closed"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    /// Flags transactions whose normalized amount exceeds 5.0
    struct AmountClassifier;

    impl SupervisedPredictor for AmountClassifier {
        fn fraud_probability(&self, features: &[f64]) -> EngineResult<f64> {
            Ok(if features[0] > 5.0 { 0.9 } else { 0.2 })
        }

        fn name(&self) -> &str {
            "amount"
        }
    }

    fn engine(supervised: SupervisedState, anomaly: AnomalyState) -> RiskEngine {
        let extractor = FeatureExtractor::new(Box::new(FixedSignals::new(0.5, 0.5)));
        RiskEngine::new(extractor, supervised, anomaly)
    }

    fn loaded(prob: f64, verdict: AnomalyVerdict) -> RiskEngine {
        engine(
            PredictorState::Loaded(Box::new(StubClassifier(prob))),
            PredictorState::Loaded(Box::new(StubDetector(verdict))),
        )
    }

    fn tx(amount: f64) -> Transaction {
        Transaction::new(amount, 1_700_000_000, "m_100", "NYC")
    }

    #[test]
    fn test_both_predictors_absent() {
        let engine = engine(PredictorState::Unavailable, PredictorState::Unavailable);
        let result = engine.score(&tx(120.0)).unwrap();

        assert_eq!(result.score, 10);
        assert_eq!(result.decision, Decision::Allow);
        assert!(result.factors.is_empty());
        assert_eq!(result.model_version, MODEL_VERSION);
        assert!(!engine.is_ready());
    }

    #[test]
    fn test_pattern_match_with_anomaly_blocks() {
        let engine = loaded(0.95, AnomalyVerdict::Anomalous);
        let result = engine.score(&tx(4_000.0)).unwrap();

        assert_eq!(result.score, 97);
        assert_eq!(result.decision, Decision::Block);
        assert_eq!(
            result.factors,
            vec![RiskFactor::XgbPatternMatch, RiskFactor::AnomalyDetected]
        );
        assert!(engine.is_ready());
    }

    #[test]
    fn test_moderate_probability_allows() {
        let result = loaded(0.50, AnomalyVerdict::Normal).score(&tx(80.0)).unwrap();

        assert_eq!(result.score, 35);
        assert_eq!(result.decision, Decision::Allow);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn test_flag_band() {
        // 0.55 -> 55 * 0.7 = 38.5 + 30 = 68.5 -> 69
        let result = loaded(0.55, AnomalyVerdict::Anomalous).score(&tx(80.0)).unwrap();
        assert_eq!(result.score, 69);
        assert_eq!(result.decision, Decision::Flag);
        assert_eq!(result.factors, vec![RiskFactor::AnomalyDetected]);
    }

    #[test]
    fn test_only_anomaly_detector_loaded() {
        let engine = engine(
            PredictorState::Unavailable,
            PredictorState::Loaded(Box::new(StubDetector(AnomalyVerdict::Anomalous))),
        );
        let result = engine.score(&tx(10.0)).unwrap();

        assert_eq!(result.score, 40);
        assert_eq!(result.decision, Decision::Allow);
        assert!(!engine.health().models_loaded);
    }

    #[test]
    fn test_runtime_failure_degrades_to_fallback() {
        let engine = engine(
            PredictorState::Loaded(Box::new(BrokenClassifier)),
            PredictorState::Loaded(Box::new(StubDetector(AnomalyVerdict::Normal))),
        );
        let outcome = engine.evaluate(&tx(10.0)).unwrap();

        assert_eq!(outcome.result.score, 10);
        assert_eq!(outcome.result.decision, Decision::Allow);
        // Both models loaded, yet this call still took the fallback
        assert!(engine.is_ready());
        assert!(outcome.degraded);
    }

    #[test]
    fn test_degraded_reflects_each_call() {
        assert!(!loaded(0.3, AnomalyVerdict::Normal).evaluate(&tx(10.0)).unwrap().degraded);

        let absent = engine(PredictorState::Unavailable, PredictorState::Unavailable);
        assert!(absent.evaluate(&tx(10.0)).unwrap().degraded);
    }

    #[test]
    fn test_nan_probability_uses_fallback() {
        let engine = engine(
            PredictorState::Loaded(Box::new(StubClassifier(f64::NAN))),
            PredictorState::Loaded(Box::new(StubDetector(AnomalyVerdict::Anomalous))),
        );
        let outcome = engine.evaluate(&tx(10.0)).unwrap();

        // Fallback 10 + anomaly 30
        assert_eq!(outcome.result.score, 40);
        assert_eq!(outcome.result.factors, vec![RiskFactor::AnomalyDetected]);
        assert!(outcome.degraded);
    }

    #[test]
    fn test_half_point_scores_round_up() {
        assert_eq!(loaded(0.45, AnomalyVerdict::Normal).score(&tx(10.0)).unwrap().score, 32);
        assert_eq!(loaded(0.85, AnomalyVerdict::Normal).score(&tx(10.0)).unwrap().score, 60);
    }

    #[test]
    fn test_features_reach_predictor() {
        let engine = engine(
            PredictorState::Loaded(Box::new(AmountClassifier)),
            PredictorState::Unavailable,
        );

        // 0.9 -> 90 * 0.7 = 63
        let high = engine.score(&tx(6_000.0)).unwrap();
        assert_eq!(high.score, 63);
        assert_eq!(high.factors, vec![RiskFactor::XgbPatternMatch]);

        let low = engine.score(&tx(100.0)).unwrap();
        assert_eq!(low.score, 14);
    }

    #[test]
    fn test_invalid_input_rejected() {
        let engine = loaded(0.5, AnomalyVerdict::Normal);

        assert!(matches!(engine.score(&tx(-1.0)), Err(EngineError::InvalidInput(_))));
        assert!(matches!(
            engine.score_features(&[0.1, 0.2, 0.3]),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.score_features(&[0.1; 6]),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.score_features(&[0.1, f64::NAN, 0.5, 0.5]),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.score_features(&[f64::INFINITY, 3.0, 0.5, 0.5]),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let engine = loaded(0.81, AnomalyVerdict::Anomalous);
        let first = serde_json::to_vec(&engine.score(&tx(900.0)).unwrap()).unwrap();

        for _ in 0..10 {
            let again = serde_json::to_vec(&engine.score(&tx(900.0)).unwrap()).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_score_always_in_range() {
        for prob in [0.0, 0.33, 0.66, 0.99, 1.0] {
            for verdict in [AnomalyVerdict::Normal, AnomalyVerdict::Anomalous] {
                let engine = RiskEngine::new(
                    FeatureExtractor::new(Box::new(RandomSignals::seeded(42))),
                    PredictorState::Loaded(Box::new(StubClassifier(prob))),
                    PredictorState::Loaded(Box::new(StubDetector(verdict))),
                );
                for amount in [0.0, 1.0, 999.99, 1e9] {
                    let result = engine.score(&tx(amount)).unwrap();
                    assert!(result.score <= 100);
                    assert_eq!(result.decision, DecisionPolicy::classify(result.score));
                }
            }
        }
    }

    #[test]
    fn test_health_reflects_predictors() {
        let health = loaded(0.1, AnomalyVerdict::Normal).health();
        assert!(health.models_loaded);
        assert_eq!(health.status, "active");
    }
}
