//! Readiness reporting for the service layer

use crate::types::result::MODEL_VERSION;
use serde::{Deserialize, Serialize};

/// Health snapshot served on the health subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `active` when both predictors are loaded, `degraded` otherwise
    pub status: String,
    pub models_loaded: bool,
    pub supervised_loaded: bool,
    pub anomaly_loaded: bool,
    pub model_version: String,
}

impl HealthStatus {
    pub fn new(supervised_loaded: bool, anomaly_loaded: bool) -> Self {
        let models_loaded = supervised_loaded && anomaly_loaded;
        Self {
            status: if models_loaded { "active" } else { "degraded" }.to_string(),
            models_loaded,
            supervised_loaded,
            anomaly_loaded,
            model_version: MODEL_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_only_with_both_models() {
        assert!(HealthStatus::new(true, true).models_loaded);
        assert_eq!(HealthStatus::new(true, true).status, "active");

        for (s, a) in [(true, false), (false, true), (false, false)] {
            let health = HealthStatus::new(s, a);
            assert!(!health.models_loaded);
            assert_eq!(health.status, "degraded");
        }
    }

    #[test]
    fn test_health_json() {
        let json = serde_json::to_value(HealthStatus::new(true, false)).unwrap();
        assert_eq!(json["models_loaded"], false);
        assert_eq!(json["supervised_loaded"], true);
        assert_eq!(json["model_version"], MODEL_VERSION);
    }
}
