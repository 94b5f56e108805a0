//! ONNX model loader

use crate::config::ModelsConfig;
use crate::models::onnx::{OnnxAnomalyDetector, OnnxClassifier};
use crate::models::predictor::{AnomalyState, PredictorState, SupervisedState};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::{info, warn};

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    pub name: String,
    pub session: Session,
    pub input_name: String,
    /// Output carrying class probabilities, if the model has one
    pub output_name: String,
}

/// Loader for ONNX models
pub struct ModelLoader {
    onnx_threads: usize,
}

impl ModelLoader {
    /// Initialise ONNX Runtime and create a loader using `onnx_threads`
    /// intra-op threads per session.
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            output_name,
        })
    }

    /// Load a model if its file exists. A missing or broken file is logged
    /// and reported as `None`; the engine runs degraded without it.
    fn load_optional(&self, path: &Path, name: &str) -> Option<LoadedModel> {
        if !path.exists() {
            warn!(model = %name, path = %path.display(), "Model file not found");
            return None;
        }
        match self.load_model(path, name) {
            Ok(model) => Some(model),
            Err(e) => {
                warn!(model = %name, error = %format!("{:#}", e), "Failed to load model, continuing without it");
                None
            }
        }
    }

    /// Load the supervised classifier and the anomaly detector.
    pub fn load_predictors(&self, config: &ModelsConfig) -> (SupervisedState, AnomalyState) {
        let models_dir = Path::new(&config.models_dir);

        let supervised: SupervisedState = match self
            .load_optional(&models_dir.join(&config.supervised_model), "supervised")
        {
            Some(model) => PredictorState::Loaded(Box::new(OnnxClassifier::new(model))),
            None => PredictorState::Unavailable,
        };

        let anomaly: AnomalyState = match self
            .load_optional(&models_dir.join(&config.anomaly_model), "anomaly")
        {
            Some(model) => PredictorState::Loaded(Box::new(OnnxAnomalyDetector::new(model))),
            None => PredictorState::Unavailable,
        };

        info!(
            supervised_loaded = supervised.is_loaded(),
            anomaly_loaded = anomaly.is_loaded(),
            models_dir = %models_dir.display(),
            "Predictors loaded"
        );

        (supervised, anomaly)
    }
}
