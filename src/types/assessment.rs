//! Published record of a scored transaction

use crate::types::result::RiskResult;
use crate::types::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Envelope published for every scored transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Unique assessment identifier
    pub assessment_id: String,

    /// The transaction as received
    pub transaction: Transaction,

    /// Engine output
    pub result: RiskResult,

    /// Time spent scoring, in microseconds
    pub processing_time_us: u64,

    /// When the assessment was produced
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn new(transaction: Transaction, result: RiskResult, processing_time: Duration) -> Self {
        Self {
            assessment_id: uuid::Uuid::new_v4().to_string(),
            transaction,
            result,
            processing_time_us: processing_time.as_micros() as u64,
            assessed_at: Utc::now(),
        }
    }
}

/// Reply sent to a requester whose transaction could not be scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedTransaction {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::result::Decision;

    #[test]
    fn test_assessment_serialization() {
        let tx = Transaction::new(250.0, 1_700_000_000, "m_42", "BER");
        let result = RiskResult::new(35, Decision::Allow, Vec::new());
        let assessment = RiskAssessment::new(tx.clone(), result.clone(), Duration::from_micros(180));

        let json = serde_json::to_string(&assessment).unwrap();
        let deserialized: RiskAssessment = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.assessment_id, assessment.assessment_id);
        assert_eq!(deserialized.transaction, tx);
        assert_eq!(deserialized.result, result);
        assert_eq!(deserialized.processing_time_us, 180);
    }

    #[test]
    fn test_assessment_ids_are_unique() {
        let tx = Transaction::new(1.0, 0, "m", "l");
        let result = RiskResult::new(10, Decision::Allow, Vec::new());
        let a = RiskAssessment::new(tx.clone(), result.clone(), Duration::ZERO);
        let b = RiskAssessment::new(tx, result, Duration::ZERO);
        assert_ne!(a.assessment_id, b.assessment_id);
    }
}
