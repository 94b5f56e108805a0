//! ONNX Runtime backed predictors

use crate::error::{EngineError, EngineResult};
use crate::models::loader::LoadedModel;
use crate::models::predictor::{AnomalyPredictor, AnomalyVerdict, SupervisedPredictor};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::sync::Mutex;
use tracing::debug;

/// Run a model on one feature row and hand the outputs to `read`
/// together with the model's probability output name.
///
/// Sessions need exclusive access while running, hence the mutex.
fn run_model<T>(
    model: &Mutex<LoadedModel>,
    features: &[f64],
    read: impl FnOnce(&ort::session::SessionOutputs, &str) -> Result<T>,
) -> Result<T> {
    let mut model = model
        .lock()
        .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

    let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
    let shape = vec![1_i64, row.len() as i64];
    let input = Tensor::from_array((shape, row)).context("Failed to create input tensor")?;

    let input_name = model.input_name.clone();
    let output_name = model.output_name.clone();
    let outputs = model.session.run(ort::inputs![input_name => input])?;

    read(&outputs, &output_name)
}

/// Supervised fraud classifier exported to ONNX (e.g. XGBoost).
pub struct OnnxClassifier {
    model: Mutex<LoadedModel>,
    name: String,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel) -> Self {
        let name = model.name.clone();
        Self {
            model: Mutex::new(model),
            name,
        }
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        run_model(&self.model, features, |outputs, output_name| {
            fraud_probability(outputs, output_name, &self.name)
        })
    }
}

impl SupervisedPredictor for OnnxClassifier {
    fn fraud_probability(&self, features: &[f64]) -> EngineResult<f64> {
        let prob = self
            .predict(features)
            .map_err(|e| EngineError::inference(&self.name, format!("{:#}", e)))?;

        // NaN passes through clamp; PredictorState::score rejects it
        Ok(prob.clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Isolation-forest style detector exported to ONNX.
pub struct OnnxAnomalyDetector {
    model: Mutex<LoadedModel>,
    name: String,
}

impl OnnxAnomalyDetector {
    pub fn new(model: LoadedModel) -> Self {
        let name = model.name.clone();
        Self {
            model: Mutex::new(model),
            name,
        }
    }

    fn predict(&self, features: &[f64]) -> Result<AnomalyVerdict> {
        run_model(&self.model, features, |outputs, _| anomaly_verdict(outputs, &self.name))
    }
}

impl AnomalyPredictor for OnnxAnomalyDetector {
    fn verdict(&self, features: &[f64]) -> EngineResult<AnomalyVerdict> {
        self.predict(features)
            .map_err(|e| EngineError::inference(&self.name, format!("{:#}", e)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Read the fraud-class probability from a classifier's outputs.
///
/// Tensor outputs come from the plain converters, `seq(map(int64, float))`
/// from exports with ZipMap enabled.
fn fraud_probability(
    outputs: &ort::session::SessionOutputs,
    output_name: &str,
    model_name: &str,
) -> Result<f64> {
    if let Some(output) = outputs.get(output_name) {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let prob = prob_from_tensor(shape, data)?;
            debug!(model = %model_name, prob = prob, "Extracted from tensor");
            return Ok(prob);
        }
        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return prob_from_sequence_map(output, model_name);
        }
    }

    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let prob = prob_from_tensor(shape, data)?;
            debug!(model = %model_name, output = %name, prob = prob, "Extracted from tensor (fallback)");
            return Ok(prob);
        }
        if DynSequenceValueType::can_downcast(&output.dtype()) {
            if let Ok(prob) = prob_from_sequence_map(&output, model_name) {
                return Ok(prob);
            }
        }
    }

    anyhow::bail!("no probability output found")
}

fn prob_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> Result<f64> {
    let dims: Vec<i64> = shape.iter().copied().collect();
    let classes = dims.last().copied().unwrap_or(0);

    let prob = match classes {
        c if c >= 2 => data.get(1),
        1 => data.first(),
        _ => data.last(),
    };
    prob.map(|&p| p as f64)
        .ok_or_else(|| anyhow::anyhow!("empty probability tensor {:?}", dims))
}

fn prob_from_sequence_map(output: &ort::value::DynValue, model_name: &str) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;
    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let first = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;
    let classes = first.try_extract_key_values::<i64, f32>()?;

    if let Some((_, prob)) = classes.iter().find(|(class, _)| *class == 1) {
        debug!(model = %model_name, prob = *prob, "Extracted from seq(map)");
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = classes.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - *prob as f64);
    }
    anyhow::bail!("no class probability in map")
}

/// Read the outlier verdict from a detector's outputs.
///
/// Prefers the int64 `label` output (`-1` outlier); otherwise a negative
/// decision `score` marks an outlier.
fn anomaly_verdict(outputs: &ort::session::SessionOutputs, model_name: &str) -> Result<AnomalyVerdict> {
    for (name, output) in outputs.iter() {
        if !name.contains("label") {
            continue;
        }
        if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
            if let Some(&label) = data.first() {
                debug!(model = %model_name, label = label, "Extracted anomaly label");
                return Ok(AnomalyVerdict::from_label(label));
            }
        }
    }

    for (name, output) in outputs.iter() {
        if !name.contains("score") {
            continue;
        }
        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            if let Some(&score) = data.first() {
                debug!(model = %model_name, score = score, "Extracted anomaly score");
                return Ok(if score < 0.0 {
                    AnomalyVerdict::Anomalous
                } else {
                    AnomalyVerdict::Normal
                });
            }
        }
    }

    anyhow::bail!("no label or score output found")
}
