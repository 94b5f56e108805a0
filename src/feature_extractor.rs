//! Feature extraction for hybrid model inference.
//!
//! Both predictors were fitted on the same four-column layout:
//! `[normalized_amount, hour_of_day, geo_signal, history_signal]`.

use crate::error::{EngineError, EngineResult};
use crate::signals::SignalSource;
use crate::types::transaction::Transaction;

/// Number of features consumed by both predictors.
pub const FEATURE_COUNT: usize = 4;

/// Divisor that brings amounts onto the training scale.
const AMOUNT_SCALE: f64 = 1000.0;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Fixed-length model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn normalized_amount(&self) -> f64 {
        self.0[0]
    }

    pub fn hour_of_day(&self) -> f64 {
        self.0[1]
    }

    pub fn geo_signal(&self) -> f64 {
        self.0[2]
    }

    pub fn history_signal(&self) -> f64 {
        self.0[3]
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = EngineError;

    fn try_from(values: &[f64]) -> EngineResult<Self> {
        let values: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| {
            EngineError::invalid_input(format!(
                "feature vector must have {} values, got {}",
                FEATURE_COUNT,
                values.len()
            ))
        })?;
        Ok(Self(values))
    }
}

/// Check a raw feature slice before it reaches a predictor.
pub fn ensure_feature_len(features: &[f64]) -> EngineResult<()> {
    if features.len() != FEATURE_COUNT {
        return Err(EngineError::invalid_input(format!(
            "feature vector must have {} values, got {}",
            FEATURE_COUNT,
            features.len()
        )));
    }
    Ok(())
}

/// Reject NaN or infinite feature values.
pub fn ensure_finite_features(features: &[f64]) -> EngineResult<()> {
    match features.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(EngineError::invalid_input(format!(
            "feature {} is not finite: {}",
            index, features[index]
        ))),
        None => Ok(()),
    }
}

/// Turns transactions into model input features.
pub struct FeatureExtractor {
    signals: Box<dyn SignalSource>,
}

impl FeatureExtractor {
    pub fn new(signals: Box<dyn SignalSource>) -> Self {
        Self { signals }
    }

    /// Build the feature vector for a validated transaction.
    pub fn extract(&self, tx: &Transaction) -> FeatureVector {
        let normalized_amount = tx.amount / AMOUNT_SCALE;
        // rem_euclid keeps pre-epoch timestamps inside [0, 24)
        let hour_of_day = tx.timestamp.rem_euclid(SECONDS_PER_DAY) as f64 / SECONDS_PER_HOUR;

        FeatureVector([
            normalized_amount,
            hour_of_day,
            self.signals.geo_signal(tx),
            self.signals.history_signal(tx),
        ])
    }

    /// Name of the configured signal source
    pub fn signal_source(&self) -> &'static str {
        self.signals.name()
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Feature names in model input order.
    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        ["normalized_amount", "hour_of_day", "geo_signal", "history_signal"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::FixedSignals;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(Box::new(FixedSignals::new(0.25, 0.75)))
    }

    #[test]
    fn test_feature_extraction() {
        // 1_700_000_000 % 86400 = 80000s -> 22.22h
        let tx = Transaction::new(250.0, 1_700_000_000, "m_1", "NYC");
        let features = extractor().extract(&tx);

        assert_eq!(features.normalized_amount(), 0.25);
        assert!((features.hour_of_day() - 80_000.0 / 3_600.0).abs() < 1e-12);
        assert_eq!(features.geo_signal(), 0.25);
        assert_eq!(features.history_signal(), 0.75);
    }

    #[test]
    fn test_amount_is_not_clamped() {
        let tx = Transaction::new(7_500.0, 0, "m_1", "NYC");
        assert_eq!(extractor().extract(&tx).normalized_amount(), 7.5);
    }

    #[test]
    fn test_hour_of_day_range() {
        let e = extractor();
        for ts in [0_i64, 3_599, 3_600, 86_399, 86_400, -1, -86_401] {
            let hour = e.extract(&Transaction::new(1.0, ts, "m", "l")).hour_of_day();
            assert!((0.0..24.0).contains(&hour), "hour {} out of range for ts {}", hour, ts);
        }
        assert_eq!(e.extract(&Transaction::new(1.0, 3_600, "m", "l")).hour_of_day(), 1.0);
    }

    #[test]
    fn test_feature_vector_length_checked() {
        assert!(FeatureVector::try_from(&[0.1, 0.2, 0.3, 0.4][..]).is_ok());
        assert!(matches!(
            FeatureVector::try_from(&[0.1, 0.2, 0.3][..]),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            ensure_feature_len(&[0.0; 5]),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_finite_features_rejected() {
        assert!(ensure_finite_features(&[0.1, 22.0, 0.5, 0.5]).is_ok());
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                ensure_finite_features(&[0.1, bad, 0.5, 0.5]),
                Err(EngineError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_feature_names() {
        let e = extractor();
        assert_eq!(e.feature_names().len(), e.feature_count());
        assert_eq!(e.signal_source(), "fixed");
    }
}
