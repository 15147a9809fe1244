//! Yield Inference Engine
//!
//! Runs trained yield models behind the [`YieldModel`] trait, persists model
//! artifacts together with their deployment descriptor, and trains the
//! bundled linear model.

mod engine;
mod metrics;
mod model;
mod trainer;

pub use engine::{CropRecommendation, PredictionEngine, PredictionInput, YieldPrediction, UNITS};
pub use metrics::RegressionMetrics;
pub use model::{LinearYieldModel, ModelArtifact, YieldModel, DESCRIPTOR_FILE, MODEL_FILE};
pub use trainer::{Trainer, TrainerConfig, TrainingReport};

use feature_engine::FeatureError;
use thiserror::Error;

/// Errors during inference and training
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Model save failed: {0}")]
    ModelSaveError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Descriptor does not match model: {0}")]
    DescriptorMismatch(String),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error("Training failed: {0}")]
    TrainingFailed(String),
}
