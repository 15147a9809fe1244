//! Model Deployment Descriptor
//!
//! Travels with a trained model and carries everything needed to build its
//! inputs: declared feature order, the baseline year for time offsets and the
//! categorical vocabularies seen during training.

use crate::error::FeatureError;
use crate::features::{indicator_name, BaseFeatures, AREA_HA};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Current descriptor schema version
pub const DESCRIPTOR_VERSION: u32 = 1;

/// Calendar-year to offset conversion used at training time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFeature {
    /// Feature name, e.g. `year_since_start`
    pub name: String,
    /// Year subtracted from the calendar year
    pub base_year: i32,
}

/// A categorical input and its training vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalDimension {
    /// Dimension name; indicator columns are `<name>_<level>`
    pub name: String,
    /// Every level seen in training, sorted
    pub levels: Vec<String>,
    /// Level dropped from the one-hot block, if any
    pub reference_level: Option<String>,
}

impl CategoricalDimension {
    pub fn contains(&self, level: &str) -> bool {
        self.levels.iter().any(|l| l == level)
    }

    pub fn indicator(&self, level: &str) -> String {
        indicator_name(&self.name, level)
    }

    /// Indicator columns, excluding the reference level
    pub fn indicators(&self) -> Vec<String> {
        self.levels
            .iter()
            .filter(|l| self.reference_level.as_deref() != Some(l.as_str()))
            .map(|l| self.indicator(l))
            .collect()
    }
}

/// Deployment metadata persisted alongside a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    pub version: u32,
    /// Model input features, in model order
    pub declared_features: Vec<String>,
    /// Declared features that are numeric base inputs
    pub numeric_features: Vec<String>,
    pub time_feature: Option<TimeFeature>,
    pub dimensions: Vec<CategoricalDimension>,
}

impl DeploymentDescriptor {
    /// Baseline year, when the model uses a time offset
    pub fn base_year(&self) -> Option<i32> {
        self.time_feature.as_ref().map(|t| t.base_year)
    }

    pub fn dimension(&self, name: &str) -> Option<&CategoricalDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn is_numeric(&self, feature: &str) -> bool {
        self.numeric_features.iter().any(|f| f == feature)
    }

    /// Base features for a calendar year and area.
    ///
    /// This is the one place calendar years become offsets. A year whose
    /// offset does not fit in `i32` is a mismatch on the time feature.
    pub fn base_features(&self, year: i32, area_ha: f64) -> Result<BaseFeatures, FeatureError> {
        let mut base = BaseFeatures::new().with(AREA_HA, area_ha);
        if let Some(time) = &self.time_feature {
            let offset = year.checked_sub(time.base_year).ok_or_else(|| {
                FeatureError::mismatch(
                    &time.name,
                    format!("year {} is out of range for base year {}", year, time.base_year),
                )
            })?;
            base.insert(&time.name, f64::from(offset));
        }
        Ok(base)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.version != DESCRIPTOR_VERSION {
            return Err(FeatureError::InvalidDescriptor(format!(
                "unsupported version {} (expected {})",
                self.version, DESCRIPTOR_VERSION
            )));
        }

        let mut seen = HashSet::new();
        for feature in &self.declared_features {
            if !seen.insert(feature.as_str()) {
                return Err(FeatureError::InvalidDescriptor(format!(
                    "duplicate feature '{}'",
                    feature
                )));
            }
        }

        for numeric in &self.numeric_features {
            if !seen.contains(numeric.as_str()) {
                return Err(FeatureError::InvalidDescriptor(format!(
                    "numeric feature '{}' is not declared",
                    numeric
                )));
            }
        }

        if let Some(time) = &self.time_feature {
            if !self.is_numeric(&time.name) {
                return Err(FeatureError::InvalidDescriptor(format!(
                    "time feature '{}' is not a numeric feature",
                    time.name
                )));
            }
        }

        let indicators: HashSet<String> = self
            .dimensions
            .iter()
            .flat_map(|d| d.levels.iter().map(move |l| d.indicator(l)))
            .collect();
        for feature in &self.declared_features {
            if !self.is_numeric(feature) && !indicators.contains(feature) {
                return Err(FeatureError::InvalidDescriptor(format!(
                    "feature '{}' is neither numeric nor a known indicator",
                    feature
                )));
            }
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String, FeatureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, FeatureError> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Load and validate a descriptor file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FeatureError> {
        let file = File::open(&path)?;
        let descriptor: Self = serde_json::from_reader(BufReader::new(file))?;
        descriptor.validate()?;
        info!(
            "Loaded deployment descriptor: {} features, base_year={:?}",
            descriptor.declared_features.len(),
            descriptor.base_year()
        );
        Ok(descriptor)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FeatureError> {
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        debug!("Saved deployment descriptor to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::YEAR_SINCE_START;

    pub(crate) fn crop_descriptor() -> DeploymentDescriptor {
        DeploymentDescriptor {
            version: DESCRIPTOR_VERSION,
            declared_features: vec![
                YEAR_SINCE_START.to_string(),
                AREA_HA.to_string(),
                "crop_Maize".to_string(),
                "crop_Sorghum".to_string(),
            ],
            numeric_features: vec![YEAR_SINCE_START.to_string(), AREA_HA.to_string()],
            time_feature: Some(TimeFeature {
                name: YEAR_SINCE_START.to_string(),
                base_year: 2005,
            }),
            dimensions: vec![CategoricalDimension {
                name: "crop".to_string(),
                levels: vec![
                    "Beans".to_string(),
                    "Maize".to_string(),
                    "Sorghum".to_string(),
                ],
                reference_level: Some("Beans".to_string()),
            }],
        }
    }

    #[test]
    fn test_valid_descriptor() {
        assert!(crop_descriptor().validate().is_ok());
    }

    #[test]
    fn test_base_features_use_descriptor_baseline() {
        let base = crop_descriptor().base_features(2015, 12.5).unwrap();
        assert_eq!(base.get(YEAR_SINCE_START), Some(10.0));
        assert_eq!(base.get(AREA_HA), Some(12.5));
    }

    #[test]
    fn test_base_features_reject_overflowing_year() {
        let err = crop_descriptor().base_features(i32::MIN, 1.0).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::FeatureMismatch { ref feature, .. } if feature == YEAR_SINCE_START
        ));
        assert!(crop_descriptor().base_features(i32::MAX, 1.0).is_ok());
    }

    #[test]
    fn test_unknown_declared_feature_rejected() {
        let mut descriptor = crop_descriptor();
        descriptor.declared_features.push("precip_mm".to_string());
        assert!(matches!(
            descriptor.validate(),
            Err(FeatureError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_duplicate_feature_rejected() {
        let mut descriptor = crop_descriptor();
        descriptor.declared_features.push(AREA_HA.to_string());
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn test_version_checked() {
        let mut descriptor = crop_descriptor();
        descriptor.version = 99;
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn test_reference_level_has_no_indicator() {
        let descriptor = crop_descriptor();
        let crop = descriptor.dimension("crop").unwrap();
        assert_eq!(crop.indicators(), vec!["crop_Maize", "crop_Sorghum"]);
        assert!(crop.contains("Beans"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("descriptor.json");
        let descriptor = crop_descriptor();
        descriptor.save(&path).unwrap();
        assert_eq!(DeploymentDescriptor::load(&path).unwrap(), descriptor);
    }
}
