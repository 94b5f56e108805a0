//! Configuration management for the risk engine service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Where the geo/history feature signals come from
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalSourceKind {
    /// Digest of the transaction identifiers, reproducible across calls
    #[default]
    Deterministic,
    /// Uniform random placeholders
    Random,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub signals: SignalsConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transactions
    pub transaction_subject: String,
    /// Subject every assessment is published to
    pub result_subject: String,
    /// Request/reply subject for readiness checks
    pub health_subject: String,
    /// Queue group shared by engine replicas
    #[serde(default = "default_queue_group")]
    pub queue_group: String,
}

fn default_queue_group() -> String {
    "risk-engine".to_string()
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing ONNX model files
    pub models_dir: String,
    /// Supervised classifier file name
    #[serde(default = "default_supervised_model")]
    pub supervised_model: String,
    /// Anomaly detector file name
    #[serde(default = "default_anomaly_model")]
    pub anomaly_model: String,
    /// Intra-op threads per ONNX session
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_supervised_model() -> String {
    "xgb_fraud.onnx".to_string()
}

fn default_anomaly_model() -> String {
    "iso_forest.onnx".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            supervised_model: default_supervised_model(),
            anomaly_model: default_anomaly_model(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Feature signal configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SignalsConfig {
    #[serde(default)]
    pub source: SignalSourceKind,
    /// Seed for the random source; unseeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum transactions scored concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_report_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a file, with `RISK__SECTION__KEY`
    /// environment variables taking precedence.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("RISK").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be at least 1");
        }
        if self.pipeline.report_interval_secs == 0 {
            anyhow::bail!("pipeline.report_interval_secs must be at least 1");
        }
        if self.models.onnx_threads == 0 {
            anyhow::bail!("models.onnx_threads must be at least 1");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                transaction_subject: "transactions".to_string(),
                result_subject: "risk.results".to_string(),
                health_subject: "risk.health".to_string(),
                queue_group: default_queue_group(),
            },
            models: ModelsConfig::default(),
            signals: SignalsConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                report_interval_secs: default_report_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
