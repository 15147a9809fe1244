//! Prediction Engine

use crate::metrics::RegressionMetrics;
use crate::model::{ModelArtifact, YieldModel};
use crate::InferenceError;
use data_cleaner::CanonicalTable;
use feature_engine::{
    CategoricalSelection, DeploymentDescriptor, FeatureAligner, FeatureError, AREA_HA,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Unit of every predicted yield
pub const UNITS: &str = "tons/ha";

/// User-supplied prediction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub year: i32,
    pub area_ha: f64,
    pub crop: String,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub production_system: Option<String>,
}

/// Yield estimate for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldPrediction {
    /// Rounded to 2 decimals, never negative
    pub predicted_yield: f64,
    pub units: String,
    /// `predicted_yield * area_ha`
    pub estimated_production_tons: f64,
    /// Selections the model never saw in training
    pub unrecognized: Vec<CategoricalSelection>,
}

/// One entry of a best-crop ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecommendation {
    pub crop: String,
    pub predicted_yield: f64,
}

/// Aligns inputs with a model's descriptor and runs the model
pub struct PredictionEngine {
    model: Arc<dyn YieldModel>,
    aligner: FeatureAligner,
}

impl PredictionEngine {
    /// Create an engine; the model and descriptor must declare the same features
    pub fn new(
        model: Arc<dyn YieldModel>,
        descriptor: DeploymentDescriptor,
    ) -> Result<Self, InferenceError> {
        if model.declared_feature_names() != descriptor.declared_features.as_slice() {
            return Err(InferenceError::DescriptorMismatch(
                "model and descriptor declare different features".to_string(),
            ));
        }
        info!(
            "Creating prediction engine: {} features, base_year={:?}",
            descriptor.declared_features.len(),
            descriptor.base_year()
        );
        Ok(Self {
            model,
            aligner: FeatureAligner::new(descriptor)?,
        })
    }

    /// Engine for a loaded artifact
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, InferenceError> {
        Self::new(Arc::new(artifact.model), artifact.descriptor)
    }

    pub fn descriptor(&self) -> &DeploymentDescriptor {
        self.aligner.descriptor()
    }

    /// Predict yield for user-supplied parameters
    pub fn predict(&self, input: &PredictionInput) -> Result<YieldPrediction, InferenceError> {
        if input.area_ha.is_nan() || input.area_ha <= 0.0 {
            return Err(FeatureError::FeatureMismatch {
                feature: AREA_HA.to_string(),
                reason: format!("area must be positive, got {}", input.area_ha),
            }
            .into());
        }

        let features = self.aligner.align_inputs(
            input.year,
            input.area_ha,
            &input.crop,
            input.production_system.as_deref(),
        )?;
        let raw = self.model.predict(&features)?;
        let predicted_yield = round2(raw.max(0.0));

        debug!(
            "Predicted {} t/ha for {} ({}) in {}",
            predicted_yield,
            input.crop,
            input.county.as_deref().unwrap_or("any county"),
            input.year
        );

        Ok(YieldPrediction {
            predicted_yield,
            units: UNITS.to_string(),
            estimated_production_tons: round2(predicted_yield * input.area_ha),
            unrecognized: features.unrecognized,
        })
    }

    /// Rank candidate crops by predicted yield, best first.
    ///
    /// Crops whose prediction fails are skipped.
    pub fn recommend(
        &self,
        crops: &[String],
        year: i32,
        area_ha: f64,
        production_system: Option<&str>,
    ) -> Vec<CropRecommendation> {
        let mut ranked: Vec<CropRecommendation> = crops
            .iter()
            .filter_map(|crop| {
                let input = PredictionInput {
                    year,
                    area_ha,
                    crop: crop.clone(),
                    county: None,
                    production_system: production_system.map(String::from),
                };
                match self.predict(&input) {
                    Ok(prediction) => Some(CropRecommendation {
                        crop: crop.clone(),
                        predicted_yield: prediction.predicted_yield,
                    }),
                    Err(e) => {
                        debug!("Skipping {} in recommendation: {}", crop, e);
                        None
                    }
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.predicted_yield
                .partial_cmp(&a.predicted_yield)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.crop.cmp(&b.crop))
        });
        ranked
    }

    /// Score every record of a table against its actual yield
    pub fn evaluate(&self, table: &CanonicalTable) -> Result<RegressionMetrics, InferenceError> {
        let mut actual = Vec::with_capacity(table.len());
        let mut predicted = Vec::with_capacity(table.len());
        for record in table.records() {
            let features = self.aligner.align_record(record)?;
            predicted.push(self.model.predict(&features)?);
            actual.push(record.yield_ton_per_ha);
        }
        Ok(RegressionMetrics::calculate(&actual, &predicted))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
