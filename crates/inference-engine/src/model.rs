//! Yield Models and Artifacts

use crate::InferenceError;
use feature_engine::{DeploymentDescriptor, FeatureVector};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Model file inside an artifact directory
pub const MODEL_FILE: &str = "model.json";
/// Descriptor file inside an artifact directory
pub const DESCRIPTOR_FILE: &str = "descriptor.json";

/// A trained regression model: feature vector in, yield out
pub trait YieldModel: Send + Sync {
    /// Predict yield (tons/ha)
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError>;

    /// Input features the model was fit on, in order
    fn declared_feature_names(&self) -> &[String];
}

/// Linear regression over named features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearYieldModel {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearYieldModel {
    pub fn new(
        feature_names: Vec<String>,
        coefficients: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, InferenceError> {
        if feature_names.len() != coefficients.len() {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{} coefficients", feature_names.len()),
                actual: format!("{} coefficients", coefficients.len()),
            });
        }
        Ok(Self {
            feature_names,
            coefficients,
            intercept,
        })
    }

    /// Coefficient of one feature
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.coefficients[idx])
    }
}

impl YieldModel for LinearYieldModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        if features.names() != self.feature_names.as_slice() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.feature_names.join(","),
                actual: features.names().join(","),
            });
        }

        let value = self.intercept
            + features
                .values()
                .iter()
                .zip(&self.coefficients)
                .map(|(x, w)| x * w)
                .sum::<f64>();

        if value.is_finite() {
            Ok(value)
        } else {
            Err(InferenceError::InferenceFailed(format!(
                "non-finite prediction {}",
                value
            )))
        }
    }

    fn declared_feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

/// Trained model plus the descriptor it must be served with
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub model: LinearYieldModel,
    pub descriptor: DeploymentDescriptor,
}

impl ModelArtifact {
    /// Bundle a model with its descriptor; declared features must agree
    pub fn new(
        model: LinearYieldModel,
        descriptor: DeploymentDescriptor,
    ) -> Result<Self, InferenceError> {
        if model.declared_feature_names() != descriptor.declared_features.as_slice() {
            return Err(InferenceError::DescriptorMismatch(format!(
                "model declares [{}], descriptor declares [{}]",
                model.feature_names.join(","),
                descriptor.declared_features.join(",")
            )));
        }
        Ok(Self { model, descriptor })
    }

    /// Load `model.json` and `descriptor.json` from a directory
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, InferenceError> {
        let dir = dir.as_ref();
        info!("Loading model artifact from {}", dir.display());

        let file = File::open(dir.join(MODEL_FILE))
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", MODEL_FILE, e)))?;
        let model: LinearYieldModel = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", MODEL_FILE, e)))?;
        if model.feature_names.len() != model.coefficients.len() {
            return Err(InferenceError::ModelLoadError(
                "coefficient count does not match feature count".to_string(),
            ));
        }

        let descriptor = DeploymentDescriptor::load(dir.join(DESCRIPTOR_FILE))?;
        Self::new(model, descriptor)
    }

    /// Write both files into a directory, creating it if needed
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<(), InferenceError> {
        let dir = dir.as_ref();
        let save_error = |e: &dyn std::fmt::Display| {
            InferenceError::ModelSaveError(format!("{}: {}", dir.display(), e))
        };
        fs::create_dir_all(dir).map_err(|e| save_error(&e))?;

        let file = File::create(dir.join(MODEL_FILE)).map_err(|e| save_error(&e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.model).map_err(|e| save_error(&e))?;
        writer.flush().map_err(|e| save_error(&e))?;
        self.descriptor
            .save(dir.join(DESCRIPTOR_FILE))
            .map_err(|e| save_error(&e))?;

        debug!("Saved model artifact to {}", dir.display());
        Ok(())
    }
}
