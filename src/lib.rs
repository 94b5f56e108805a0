//! Hybrid Risk Engine Library
//!
//! Real-time fraud risk scoring that blends a supervised classifier with an
//! unsupervised anomaly detector into a 0-100 score and an
//! ALLOW / FLAG / BLOCK decision, degrading gracefully when either model is
//! missing.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod health;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod scoring;
pub mod signals;
pub mod threat;
pub mod types;

pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use error::{EngineError, EngineResult};
pub use feature_extractor::{FeatureExtractor, FeatureVector};
pub use health::HealthStatus;
pub use producer::ResultProducer;
pub use scoring::RiskEngine;
pub use types::{Decision, RiskAssessment, RiskFactor, RiskResult, Transaction, MODEL_VERSION};
