//! Feature Vector Types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Years since the model's baseline year
pub const YEAR_SINCE_START: &str = "year_since_start";
/// Planted area in hectares
pub const AREA_HA: &str = "area_ha";

/// Base numeric inputs, keyed by feature name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseFeatures(BTreeMap<String, f64>);

impl BaseFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Chosen level for one categorical dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalSelection {
    /// Dimension name, e.g. `crop`
    pub dimension: String,
    /// Selected level, e.g. `Maize`
    pub level: String,
}

impl CategoricalSelection {
    pub fn new(dimension: &str, level: &str) -> Self {
        Self {
            dimension: dimension.to_string(),
            level: level.to_string(),
        }
    }

    /// Indicator column name for this selection
    pub fn indicator(&self) -> String {
        indicator_name(&self.dimension, &self.level)
    }
}

/// One-hot column name for a dimension level
pub fn indicator_name(dimension: &str, level: &str) -> String {
    format!("{}_{}", dimension, level)
}

/// Model input, ordered exactly like the model's declared features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
    /// Selections whose level was not seen in training. Their indicator
    /// block is all zero, which the model cannot tell apart from the
    /// reference level.
    pub unrecognized: Vec<CategoricalSelection>,
}

impl FeatureVector {
    pub(crate) fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self {
            names,
            values,
            unrecognized: Vec::new(),
        }
    }

    /// Feature names in model order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Feature values in model order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of one feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// `(name, value)` pairs in model order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every categorical selection was known at training time
    pub fn fully_recognized(&self) -> bool {
        self.unrecognized.is_empty()
    }
}
