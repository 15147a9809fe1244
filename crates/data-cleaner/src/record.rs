//! Canonical Records and Table

use crate::columns;
use crate::error::CleaningError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;

/// One cleaned production record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub county: String,
    pub crop: String,
    pub year: i32,
    pub area_ha: f64,
    pub production_tons: f64,
    /// Always `production_tons / area_ha`
    pub yield_ton_per_ha: f64,
    /// Production system label, when the source carries one
    pub production_system: Option<String>,
}

impl CanonicalRecord {
    /// Create a record, deriving yield from production and area
    pub fn new(county: &str, crop: &str, year: i32, area_ha: f64, production_tons: f64) -> Self {
        Self {
            county: county.to_string(),
            crop: crop.to_string(),
            year,
            area_ha,
            production_tons,
            yield_ton_per_ha: production_tons / area_ha,
            production_system: None,
        }
    }

    /// Attach a production system label
    pub fn with_production_system(mut self, system: &str) -> Self {
        self.production_system = Some(system.to_string());
        self
    }
}

/// Non-empty set of canonical records
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    /// Wrap records; an empty set is `DataUnavailable`
    pub fn from_records(records: Vec<CanonicalRecord>) -> Result<Self, CleaningError> {
        if records.is_empty() {
            return Err(CleaningError::DataUnavailable { rows_read: 0 });
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct county names, sorted
    pub fn counties(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.county.as_str()))
    }

    /// Distinct crop names, sorted
    pub fn crops(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.crop.as_str()))
    }

    /// Distinct crops grown in one county, sorted
    pub fn crops_in_county(&self, county: &str) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter(|r| r.county == county)
                .map(|r| r.crop.as_str()),
        )
    }

    /// Distinct production systems, sorted
    pub fn production_systems(&self) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter_map(|r| r.production_system.as_deref()),
        )
    }

    /// Records for one county and crop
    pub fn filter<'a>(
        &'a self,
        county: &'a str,
        crop: &'a str,
    ) -> impl Iterator<Item = &'a CanonicalRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.county == county && r.crop == crop)
    }

    /// Earliest harvest year
    pub fn min_year(&self) -> i32 {
        self.records.iter().map(|r| r.year).min().unwrap_or_default()
    }

    /// Latest harvest year
    pub fn max_year(&self) -> i32 {
        self.records.iter().map(|r| r.year).max().unwrap_or_default()
    }

    /// Write the table as CSV using canonical column names.
    ///
    /// The production system column is written only when some record has one.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), CleaningError> {
        let with_system = self.records.iter().any(|r| r.production_system.is_some());
        let mut writer = csv::Writer::from_writer(writer);

        let mut header = vec![
            columns::COUNTY,
            columns::CROP,
            columns::YEAR,
            columns::AREA_HA,
            columns::PRODUCTION_TONS,
            columns::YIELD_TON_PER_HA,
        ];
        if with_system {
            header.push(columns::PRODUCTION_SYSTEM);
        }
        writer
            .write_record(&header)
            .map_err(|e| CleaningError::WriteFailed(e.to_string()))?;

        for r in &self.records {
            let mut row = vec![
                r.county.clone(),
                r.crop.clone(),
                r.year.to_string(),
                r.area_ha.to_string(),
                r.production_tons.to_string(),
                r.yield_ton_per_ha.to_string(),
            ];
            if with_system {
                row.push(r.production_system.clone().unwrap_or_default());
            }
            writer
                .write_record(&row)
                .map_err(|e| CleaningError::WriteFailed(e.to_string()))?;
        }

        writer
            .flush()
            .map_err(|e| CleaningError::WriteFailed(e.to_string()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CanonicalTable {
        CanonicalTable::from_records(vec![
            CanonicalRecord::new("Nakuru", "Maize", 2018, 10.0, 30.0),
            CanonicalRecord::new("Kisumu", "Sorghum", 2019, 4.0, 6.0),
            CanonicalRecord::new("Kisumu", "Maize", 2020, 5.0, 10.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_metadata_sorted_distinct() {
        let table = sample();
        assert_eq!(table.counties(), vec!["Kisumu", "Nakuru"]);
        assert_eq!(table.crops(), vec!["Maize", "Sorghum"]);
        assert_eq!(table.crops_in_county("Nakuru"), vec!["Maize"]);
    }

    #[test]
    fn test_year_bounds() {
        let table = sample();
        assert_eq!(table.min_year(), 2018);
        assert_eq!(table.max_year(), 2020);
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = CanonicalTable::from_records(Vec::new()).unwrap_err();
        assert!(matches!(err, CleaningError::DataUnavailable { .. }));
    }

    #[test]
    fn test_write_csv_header() {
        let mut out = Vec::new();
        sample().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let first = text.lines().next().unwrap();
        assert_eq!(
            first,
            "county,crop,year,area_ha,production_tons,yield_ton_per_ha"
        );
        assert_eq!(text.lines().count(), 4);
    }
}
