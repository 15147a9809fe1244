//! Feature Alignment
//!
//! Builds model inputs whose names and order match the model's declared
//! feature list exactly. Declared indicators that do not match the current
//! selection are 0; anything the model does not declare is dropped.

use crate::descriptor::DeploymentDescriptor;
use crate::error::FeatureError;
use crate::features::{BaseFeatures, CategoricalSelection, FeatureVector};
use data_cleaner::{columns, CanonicalRecord};
use tracing::{debug, warn};

/// Dimensions whose indicator blocks are recognized even when unselected
const KNOWN_DIMENSIONS: [&str; 2] = [columns::CROP, columns::PRODUCTION_SYSTEM];

/// Align inputs against a bare declared feature list.
///
/// A declared name belongs to a dimension's indicator block when it starts
/// with `<dimension>_`, for the selected dimensions plus crop and production
/// system. The longest matching dimension wins, so
/// `crop_production_system_X` never counts as a `crop` indicator. Indicators
/// no selection names are 0. Every other declared name must be a finite base
/// feature.
pub fn align(
    base: &BaseFeatures,
    selections: &[CategoricalSelection],
    declared: &[String],
) -> Result<FeatureVector, FeatureError> {
    let mut dimensions: Vec<&str> = selections.iter().map(|s| s.dimension.as_str()).collect();
    dimensions.extend(KNOWN_DIMENSIONS);

    let mut values = Vec::with_capacity(declared.len());
    for name in declared {
        let owner = dimensions
            .iter()
            .copied()
            .filter(|dim| {
                name.strip_prefix(dim)
                    .is_some_and(|rest| rest.starts_with('_'))
            })
            .max_by_key(|dim| dim.len());

        let value = match owner {
            Some(dimension) => indicator_value(name, selections, dimension),
            None => base_value(base, name)?,
        };
        values.push(value);
    }

    Ok(FeatureVector::new(declared.to_vec(), values))
}

/// 1.0 when some selection in `dimension` names exactly this indicator
fn indicator_value(name: &str, selections: &[CategoricalSelection], dimension: &str) -> f64 {
    let hit = selections
        .iter()
        .any(|s| s.dimension == dimension && s.indicator() == name);
    if hit {
        1.0
    } else {
        0.0
    }
}

fn base_value(base: &BaseFeatures, name: &str) -> Result<f64, FeatureError> {
    match base.get(name) {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(FeatureError::mismatch(name, format!("value {} is not numeric", v))),
        None => Err(FeatureError::mismatch(name, "required base feature is missing")),
    }
}

/// Aligner bound to one model's deployment descriptor
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    descriptor: DeploymentDescriptor,
}

impl FeatureAligner {
    /// Create an aligner; the descriptor is validated first
    pub fn new(descriptor: DeploymentDescriptor) -> Result<Self, FeatureError> {
        descriptor.validate()?;
        Ok(Self { descriptor })
    }

    pub fn descriptor(&self) -> &DeploymentDescriptor {
        &self.descriptor
    }

    /// Declared feature names, in model order
    pub fn declared_features(&self) -> &[String] {
        &self.descriptor.declared_features
    }

    /// Align base features and categorical selections.
    ///
    /// Levels outside the training vocabulary are not an error: their block
    /// stays all zero and the selection is reported in
    /// [`FeatureVector::unrecognized`].
    pub fn align(
        &self,
        base: &BaseFeatures,
        selections: &[CategoricalSelection],
    ) -> Result<FeatureVector, FeatureError> {
        let mut known = Vec::with_capacity(selections.len());
        let mut unrecognized = Vec::new();

        for selection in selections {
            match self.descriptor.dimension(&selection.dimension) {
                None => debug!(
                    "Ignoring selection for dimension '{}' unknown to the model",
                    selection.dimension
                ),
                Some(dim) if !dim.contains(&selection.level) => {
                    warn!(
                        "Level '{}' of '{}' was not seen in training; indicator block is all zero",
                        selection.level, selection.dimension
                    );
                    unrecognized.push(selection.clone());
                }
                Some(_) => known.push(selection.indicator()),
            }
        }

        let mut values = Vec::with_capacity(self.descriptor.declared_features.len());
        for name in &self.descriptor.declared_features {
            let value = if self.descriptor.is_numeric(name) {
                base_value(base, name)?
            } else if known.iter().any(|k| k == name) {
                1.0
            } else {
                0.0
            };
            values.push(value);
        }

        let mut vector = FeatureVector::new(self.descriptor.declared_features.clone(), values);
        vector.unrecognized = unrecognized;
        Ok(vector)
    }

    /// Align user-supplied prediction parameters
    pub fn align_inputs(
        &self,
        year: i32,
        area_ha: f64,
        crop: &str,
        production_system: Option<&str>,
    ) -> Result<FeatureVector, FeatureError> {
        let base = self.descriptor.base_features(year, area_ha)?;
        let mut selections = vec![CategoricalSelection::new(columns::CROP, crop)];
        if let Some(system) = production_system {
            selections.push(CategoricalSelection::new(columns::PRODUCTION_SYSTEM, system));
        }
        self.align(&base, &selections)
    }

    /// Align a stored canonical record for re-scoring
    pub fn align_record(&self, record: &CanonicalRecord) -> Result<FeatureVector, FeatureError> {
        self.align_inputs(
            record.year,
            record.area_ha,
            &record.crop,
            record.production_system.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::tests::crop_descriptor;
    use crate::features::{AREA_HA, YEAR_SINCE_START};
    use proptest::prelude::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_beans_against_three_crops() {
        let declared = names(&[YEAR_SINCE_START, AREA_HA, "crop_Maize", "crop_Beans", "crop_Wheat"]);
        let base = BaseFeatures::new()
            .with(YEAR_SINCE_START, 3.0)
            .with(AREA_HA, 10.0);
        let v = align(&base, &[CategoricalSelection::new("crop", "Beans")], &declared).unwrap();

        assert_eq!(v.names(), declared.as_slice());
        assert_eq!(v.values(), &[3.0, 10.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_extra_base_features_dropped() {
        let declared = names(&[AREA_HA, "crop_Maize"]);
        let base = BaseFeatures::new()
            .with(AREA_HA, 2.0)
            .with("county_code", 47.0);
        let v = align(&base, &[CategoricalSelection::new("crop", "Maize")], &declared).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.get("county_code"), None);
    }

    #[test]
    fn test_missing_area_is_mismatch() {
        let declared = names(&[YEAR_SINCE_START, AREA_HA, "crop_Maize"]);
        let base = BaseFeatures::new().with(YEAR_SINCE_START, 1.0);
        let err = align(&base, &[CategoricalSelection::new("crop", "Maize")], &declared).unwrap_err();
        assert!(matches!(err, FeatureError::FeatureMismatch { ref feature, .. } if feature == AREA_HA));
    }

    #[test]
    fn test_non_numeric_area_is_mismatch() {
        let declared = names(&[AREA_HA]);
        let base = BaseFeatures::new().with(AREA_HA, f64::NAN);
        assert!(matches!(
            align(&base, &[], &declared),
            Err(FeatureError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let declared = names(&[
            AREA_HA,
            "crop_Maize",
            "crop_production_system_Irrigated",
            "crop_production_system_Rainfed",
        ]);
        let base = BaseFeatures::new().with(AREA_HA, 1.0);
        let selections = [
            CategoricalSelection::new("crop", "Maize"),
            CategoricalSelection::new("crop_production_system", "Rainfed"),
        ];
        let v = align(&base, &selections, &declared).unwrap();
        assert_eq!(v.values(), &[1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unselected_dimensions_are_zero() {
        let declared = names(&[AREA_HA, "crop_Maize", "crop_production_system_Irrigated"]);
        let base = BaseFeatures::new().with(AREA_HA, 4.0);

        let v = align(&base, &[], &declared).unwrap();
        assert_eq!(v.values(), &[4.0, 0.0, 0.0]);

        let system_only = [CategoricalSelection::new("crop_production_system", "Irrigated")];
        let v = align(&base, &system_only, &declared).unwrap();
        assert_eq!(v.values(), &[4.0, 0.0, 1.0]);
    }

    #[test]
    fn test_aligner_unknown_level_degrades() {
        let aligner = FeatureAligner::new(crop_descriptor()).unwrap();
        let v = aligner.align_inputs(2010, 5.0, "Cassava", None).unwrap();

        assert_eq!(v.values(), &[5.0, 5.0, 0.0, 0.0]);
        assert_eq!(v.unrecognized, vec![CategoricalSelection::new("crop", "Cassava")]);
    }

    #[test]
    fn test_aligner_reference_level_is_recognized() {
        let aligner = FeatureAligner::new(crop_descriptor()).unwrap();
        let v = aligner.align_inputs(2010, 5.0, "Beans", None).unwrap();
        assert_eq!(v.values(), &[5.0, 5.0, 0.0, 0.0]);
        assert!(v.fully_recognized());
    }

    #[test]
    fn test_aligner_ignores_unknown_dimension() {
        let aligner = FeatureAligner::new(crop_descriptor()).unwrap();
        let v = aligner.align_inputs(2006, 1.5, "Sorghum", Some("Irrigated")).unwrap();
        assert_eq!(v.values(), &[1.0, 1.5, 0.0, 1.0]);
        assert!(v.fully_recognized());
    }

    #[test]
    fn test_align_record() {
        let aligner = FeatureAligner::new(crop_descriptor()).unwrap();
        let record = CanonicalRecord::new("Kisumu", "Maize", 2015, 10.0, 50.0);
        let v = aligner.align_record(&record).unwrap();
        assert_eq!(v.get(YEAR_SINCE_START), Some(10.0));
        assert_eq!(v.get("crop_Maize"), Some(1.0));
    }

    #[test]
    fn test_aligner_missing_time_feature() {
        let aligner = FeatureAligner::new(crop_descriptor()).unwrap();
        let base = BaseFeatures::new().with(AREA_HA, 3.0);
        let err = aligner
            .align(&base, &[CategoricalSelection::new("crop", "Maize")])
            .unwrap_err();
        assert!(matches!(err, FeatureError::FeatureMismatch { .. }));
    }

    proptest! {
        #[test]
        fn prop_output_matches_declared(
            crops in prop::collection::btree_set("[A-Z][a-z]{2,8}", 1..8),
            pick in any::<prop::sample::Index>(),
            area in 0.1f64..1000.0,
            offset in 0.0f64..30.0,
            reverse in any::<bool>(),
        ) {
            let crops: Vec<String> = crops.into_iter().collect();
            let mut declared = vec![YEAR_SINCE_START.to_string(), AREA_HA.to_string()];
            declared.extend(crops.iter().map(|c| format!("crop_{c}")));
            if reverse {
                declared.reverse();
            }

            let chosen = &crops[pick.index(crops.len())];
            let base = BaseFeatures::new()
                .with(YEAR_SINCE_START, offset)
                .with(AREA_HA, area)
                .with("unused", 1.0);
            let v = align(&base, &[CategoricalSelection::new("crop", chosen)], &declared).unwrap();

            prop_assert_eq!(v.names(), declared.as_slice());
            let hot: f64 = v.iter().filter(|(n, _)| n.starts_with("crop_")).map(|(_, x)| x).sum();
            prop_assert_eq!(hot, 1.0);
        }
    }
}
