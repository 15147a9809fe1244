//! Yield Trend Analysis

use crate::TrendError;
use data_cleaner::CanonicalTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Direction of a yield trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }

    /// User-facing note
    pub fn note(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "Yield is increasing. Good trend.",
            TrendDirection::Decreasing => "Yield is decreasing. Caution advised.",
            TrendDirection::Stable => "Yield is relatively stable.",
        }
    }
}

/// Slope thresholds (tons/ha per year) for trend classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendPolicy {
    /// Slopes above this are increasing
    pub increasing_above: f64,
    /// Slopes below this are decreasing
    pub decreasing_below: f64,
}

impl Default for TrendPolicy {
    fn default() -> Self {
        Self {
            increasing_above: 0.2,
            decreasing_below: -0.2,
        }
    }
}

impl TrendPolicy {
    pub fn classify(&self, slope: f64) -> TrendDirection {
        if slope > self.increasing_above {
            TrendDirection::Increasing
        } else if slope < self.decreasing_below {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }
}

/// Mean yield for one harvest year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyYield {
    pub year: i32,
    pub yield_ton_per_ha: f64,
}

/// Trend of one crop in one county
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub county: String,
    pub crop: String,
    /// Yearly means, sorted by year
    pub points: Vec<YearlyYield>,
    /// Least-squares slope of yield on year
    pub slope: f64,
    pub direction: TrendDirection,
}

impl TrendAnalysis {
    /// Analyze the yield trend for a county and crop
    pub fn compute(
        table: &CanonicalTable,
        county: &str,
        crop: &str,
        policy: &TrendPolicy,
    ) -> Result<Self, TrendError> {
        let mut by_year: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for record in table.filter(county, crop) {
            let entry = by_year.entry(record.year).or_insert((0.0, 0));
            entry.0 += record.yield_ton_per_ha;
            entry.1 += 1;
        }

        if by_year.is_empty() {
            return Err(TrendError::NoData(format!("{} in {}", crop, county)));
        }

        let points: Vec<YearlyYield> = by_year
            .into_iter()
            .map(|(year, (sum, count))| YearlyYield {
                year,
                yield_ton_per_ha: sum / count as f64,
            })
            .collect();

        let pairs: Vec<(f64, f64)> = points
            .iter()
            .map(|p| (f64::from(p.year), p.yield_ton_per_ha))
            .collect();
        let slope = linear_slope(&pairs).ok_or(TrendError::InsufficientData {
            years: points.len(),
        })?;
        let direction = policy.classify(slope);

        debug!(
            "Trend for {} in {}: {} years, slope={:.3} ({})",
            crop,
            county,
            points.len(),
            slope,
            direction.as_str()
        );

        Ok(Self {
            county: county.to_string(),
            crop: crop.to_string(),
            points,
            slope,
            direction,
        })
    }
}

/// Least-squares slope of `y` on `x`; `None` when x has no spread
pub fn linear_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for &(x, y) in points {
        let dx = x - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }

    if sxx == 0.0 {
        None
    } else {
        Some(sxy / sxx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_cleaner::CanonicalRecord;
    use proptest::prelude::*;

    fn record(year: i32, yield_ton_per_ha: f64) -> CanonicalRecord {
        CanonicalRecord::new("Kisumu", "Maize", year, 1.0, yield_ton_per_ha)
    }

    #[test]
    fn test_increasing_trend() {
        let table = CanonicalTable::from_records(vec![
            record(2018, 2.0),
            record(2019, 2.5),
            record(2020, 3.0),
        ])
        .unwrap();
        let trend = TrendAnalysis::compute(&table, "Kisumu", "Maize", &TrendPolicy::default()).unwrap();
        assert!((trend.slope - 0.5).abs() < 1e-9);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_eq!(trend.points.len(), 3);
    }

    #[test]
    fn test_yearly_mean_before_fit() {
        let table = CanonicalTable::from_records(vec![
            record(2019, 2.0),
            record(2018, 4.0),
            record(2019, 4.0),
        ])
        .unwrap();
        let trend = TrendAnalysis::compute(&table, "Kisumu", "Maize", &TrendPolicy::default()).unwrap();
        assert_eq!(
            trend.points,
            vec![
                YearlyYield { year: 2018, yield_ton_per_ha: 4.0 },
                YearlyYield { year: 2019, yield_ton_per_ha: 3.0 },
            ]
        );
        assert_eq!(trend.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_classification_thresholds() {
        let policy = TrendPolicy::default();
        assert_eq!(policy.classify(0.21), TrendDirection::Increasing);
        assert_eq!(policy.classify(0.2), TrendDirection::Stable);
        assert_eq!(policy.classify(-0.2), TrendDirection::Stable);
        assert_eq!(policy.classify(-0.21), TrendDirection::Decreasing);
    }

    #[test]
    fn test_no_data() {
        let table = CanonicalTable::from_records(vec![record(2018, 2.0)]).unwrap();
        let err = TrendAnalysis::compute(&table, "Nakuru", "Maize", &TrendPolicy::default()).unwrap_err();
        assert!(matches!(err, TrendError::NoData(_)));
    }

    #[test]
    fn test_single_year_is_insufficient() {
        let table = CanonicalTable::from_records(vec![record(2018, 2.0), record(2018, 3.0)]).unwrap();
        let err = TrendAnalysis::compute(&table, "Kisumu", "Maize", &TrendPolicy::default()).unwrap_err();
        assert_eq!(err, TrendError::InsufficientData { years: 1 });
    }

    proptest! {
        #[test]
        fn prop_slope_of_exact_line(a in -5.0f64..5.0, b in -10.0f64..10.0, n in 2usize..20) {
            let points: Vec<(f64, f64)> = (0..n)
                .map(|i| {
                    let x = 2000.0 + i as f64;
                    (x, a * (x - 2000.0) + b)
                })
                .collect();
            let slope = linear_slope(&points).unwrap();
            prop_assert!((slope - a).abs() < 1e-6);
        }
    }
}
