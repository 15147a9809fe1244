//! Training-Time One-Hot Encoding
//!
//! Derives a deployment descriptor from a cleaned table and encodes the
//! table into a design matrix. Rows go through [`FeatureAligner`], so
//! training and serving build inputs the same way.

use crate::aligner::FeatureAligner;
use crate::descriptor::{CategoricalDimension, DeploymentDescriptor, TimeFeature, DESCRIPTOR_VERSION};
use crate::error::FeatureError;
use crate::features::{AREA_HA, YEAR_SINCE_START};
use data_cleaner::{columns, CanonicalTable};
use ndarray::{Array1, Array2};
use tracing::info;

/// Design matrix with targets
#[derive(Debug, Clone)]
pub struct EncodedTable {
    /// One row per record, columns in declared order
    pub features: Array2<f64>,
    /// `yield_ton_per_ha` per record
    pub target: Array1<f64>,
    pub feature_names: Vec<String>,
}

/// One-hot encoder for crop and production-system levels
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    /// Drop the first (alphabetical) level of each dimension as reference
    drop_first: bool,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self { drop_first: true }
    }
}

impl OneHotEncoder {
    pub fn new(drop_first: bool) -> Self {
        Self { drop_first }
    }

    /// Build the descriptor for a model trained on `table`
    pub fn fit(&self, table: &CanonicalTable) -> DeploymentDescriptor {
        let base_year = table.min_year();

        let mut dimensions = vec![self.dimension(columns::CROP, table.crops())];
        let systems = table.production_systems();
        if !systems.is_empty() {
            dimensions.push(self.dimension(columns::PRODUCTION_SYSTEM, systems));
        }

        let numeric_features = vec![YEAR_SINCE_START.to_string(), AREA_HA.to_string()];
        let mut declared_features = numeric_features.clone();
        for dim in &dimensions {
            declared_features.extend(dim.indicators());
        }

        info!(
            "Fitted encoder: base_year={}, {} features, {} dimensions",
            base_year,
            declared_features.len(),
            dimensions.len()
        );

        DeploymentDescriptor {
            version: DESCRIPTOR_VERSION,
            declared_features,
            numeric_features,
            time_feature: Some(TimeFeature {
                name: YEAR_SINCE_START.to_string(),
                base_year,
            }),
            dimensions,
        }
    }

    fn dimension(&self, name: &str, levels: Vec<String>) -> CategoricalDimension {
        let reference_level = if self.drop_first {
            levels.first().cloned()
        } else {
            None
        };
        CategoricalDimension {
            name: name.to_string(),
            levels,
            reference_level,
        }
    }

    /// Encode every record of `table` with `aligner`
    pub fn encode(
        &self,
        aligner: &FeatureAligner,
        table: &CanonicalTable,
    ) -> Result<EncodedTable, FeatureError> {
        let width = aligner.declared_features().len();
        let mut flat = Vec::with_capacity(table.len() * width);
        let mut target = Vec::with_capacity(table.len());

        for record in table.records() {
            let vector = aligner.align_record(record)?;
            flat.extend_from_slice(vector.values());
            target.push(record.yield_ton_per_ha);
        }

        let features = Array2::from_shape_vec((table.len(), width), flat)
            .map_err(|e| FeatureError::EncodingFailed(e.to_string()))?;

        Ok(EncodedTable {
            features,
            target: Array1::from(target),
            feature_names: aligner.declared_features().to_vec(),
        })
    }

    /// Fit a descriptor and encode the same table
    pub fn fit_encode(
        &self,
        table: &CanonicalTable,
    ) -> Result<(FeatureAligner, EncodedTable), FeatureError> {
        let aligner = FeatureAligner::new(self.fit(table))?;
        let encoded = self.encode(&aligner, table)?;
        Ok((aligner, encoded))
    }
}
