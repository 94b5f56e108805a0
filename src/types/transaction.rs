//! Transaction record scored by the engine

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// A payment transaction to be scored for fraud risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Amount in currency units (non-negative)
    pub amount: f64,

    /// Seconds since the Unix epoch
    pub timestamp: i64,

    /// Merchant identifier
    pub merchant: String,

    /// Location identifier (city, region or terminal zone)
    pub location: String,
}

impl Transaction {
    pub fn new(
        amount: f64,
        timestamp: i64,
        merchant: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            timestamp,
            merchant: merchant.into(),
            location: location.into(),
        }
    }

    /// Reject records the feature builder cannot accept.
    pub fn validate(&self) -> EngineResult<()> {
        if !self.amount.is_finite() {
            return Err(EngineError::invalid_input("amount must be a finite number"));
        }
        if self.amount < 0.0 {
            return Err(EngineError::invalid_input(format!(
                "amount must be non-negative, got {}",
                self.amount
            )));
        }
        if self.merchant.trim().is_empty() {
            return Err(EngineError::invalid_input("merchant must not be empty"));
        }
        if self.location.trim().is_empty() {
            return Err(EngineError::invalid_input("location must not be empty"));
        }
        Ok(())
    }
}
