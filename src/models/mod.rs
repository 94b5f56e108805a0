//! Predictors consumed by the scoring engine

pub mod loader;
pub mod onnx;
pub mod predictor;

pub use loader::ModelLoader;
pub use predictor::{
    AnomalyPredictor, AnomalyState, AnomalyVerdict, PredictorState, SupervisedPredictor,
    SupervisedState,
};
