//! Cleaning Pipeline
//!
//! Each stage is a total function over the working table. Stages run in a
//! fixed order: header normalization, country filter, alias renaming, junk
//! normalization, completeness filter, type coercion, validity filter,
//! yield derivation.

use crate::columns;
use crate::config::{normalize_column_name, CleaningConfig};
use crate::error::CleaningError;
use crate::record::{CanonicalRecord, CanonicalTable};
use crate::table::RawTable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Row counts per cleaning stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Data rows in the source
    pub rows_read: usize,
    /// Rows outside the configured country
    pub dropped_country: usize,
    /// Rows missing a critical field
    pub dropped_incomplete: usize,
    /// Rows whose numeric fields failed to parse
    pub dropped_unparsable: usize,
    /// Rows with non-positive area, negative production or too-early year
    pub dropped_invalid: usize,
    /// Rows in the canonical table
    pub rows_kept: usize,
}

/// Record cleaner
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    config: CleaningConfig,
}

impl Cleaner {
    /// Create a cleaner with the given provider tables
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean a CSV file
    pub fn clean_path<P: AsRef<Path>>(&self, path: P) -> Result<CanonicalTable, CleaningError> {
        info!("Cleaning {}", path.as_ref().display());
        self.clean_table(RawTable::from_path(path)?)
    }

    /// Clean CSV from a byte stream
    pub fn clean_reader<R: Read>(&self, reader: R) -> Result<CanonicalTable, CleaningError> {
        self.clean_table(RawTable::from_reader(reader)?)
    }

    /// Clean an already-loaded table
    pub fn clean_table(&self, raw: RawTable) -> Result<CanonicalTable, CleaningError> {
        self.clean_with_report(raw).map(|(table, _)| table)
    }

    /// Clean an already-loaded table and return per-stage counts
    pub fn clean_with_report(
        &self,
        mut raw: RawTable,
    ) -> Result<(CanonicalTable, CleaningReport), CleaningError> {
        let mut report = CleaningReport {
            rows_read: raw.len(),
            ..Default::default()
        };

        normalize_headers(&mut raw);
        report.dropped_country = self.filter_country(&mut raw);
        self.rename_columns(&mut raw);
        self.null_junk(&mut raw);

        let records = self.build_records(&raw, &mut report);
        report.rows_kept = records.len();

        info!(
            "Cleaning done: read={}, country={}, incomplete={}, unparsable={}, invalid={}, kept={}",
            report.rows_read,
            report.dropped_country,
            report.dropped_incomplete,
            report.dropped_unparsable,
            report.dropped_invalid,
            report.rows_kept
        );

        if records.is_empty() {
            return Err(CleaningError::DataUnavailable {
                rows_read: report.rows_read,
            });
        }

        Ok((CanonicalTable::from_records(records)?, report))
    }

    /// Keep rows from the configured country; no-op without a country column
    fn filter_country(&self, raw: &mut RawTable) -> usize {
        let (Some(country), Some(idx)) = (
            self.config.country.as_deref(),
            raw.column_index(columns::COUNTRY),
        ) else {
            return 0;
        };

        let before = raw.rows.len();
        raw.rows.retain(|row| {
            row.get(idx)
                .and_then(|c| c.as_deref())
                .is_some_and(|c| c.trim().eq_ignore_ascii_case(country.trim()))
        });
        let dropped = before - raw.rows.len();
        debug!("Country filter '{}' dropped {} rows", country, dropped);
        dropped
    }

    /// Map source aliases onto canonical names. An alias whose target already
    /// exists is left untouched.
    fn rename_columns(&self, raw: &mut RawTable) {
        let existing: HashSet<String> = raw.headers.iter().cloned().collect();
        let mut claimed = HashSet::new();

        for header in raw.headers.iter_mut() {
            let Some(target) = self.config.alias_for(header) else {
                continue;
            };
            if existing.contains(target) || claimed.contains(target) {
                debug!("Skipping alias {} -> {}: target present", header, target);
                continue;
            }
            debug!("Renaming column {} -> {}", header, target);
            claimed.insert(target.to_string());
            *header = target.to_string();
        }
    }

    fn null_junk(&self, raw: &mut RawTable) {
        let mut nulled = 0usize;
        for cell in raw.rows.iter_mut().flatten() {
            if cell.as_deref().is_some_and(|v| self.config.is_junk(v)) {
                *cell = None;
                nulled += 1;
            }
        }
        debug!("Replaced {} junk values with missing", nulled);
    }

    fn build_records(&self, raw: &RawTable, report: &mut CleaningReport) -> Vec<CanonicalRecord> {
        let critical: Option<Vec<usize>> = columns::CRITICAL
            .iter()
            .map(|name| raw.column_index(name))
            .collect();

        let Some(critical) = critical else {
            let missing: Vec<_> = columns::CRITICAL
                .iter()
                .filter(|name| raw.column_index(name).is_none())
                .collect();
            info!("Source lacks critical columns {:?}", missing);
            report.dropped_incomplete = raw.len();
            return Vec::new();
        };
        let (year_idx, area_idx, production_idx, crop_idx, county_idx) =
            (critical[0], critical[1], critical[2], critical[3], critical[4]);
        let system_idx = raw.column_index(columns::PRODUCTION_SYSTEM);

        let mut records = Vec::with_capacity(raw.len());
        for row in 0..raw.len() {
            if critical.iter().any(|&idx| raw.cell(row, idx).is_none()) {
                report.dropped_incomplete += 1;
                continue;
            }

            let parsed = (
                raw.cell(row, year_idx).and_then(parse_year),
                raw.cell(row, area_idx).and_then(parse_number),
                raw.cell(row, production_idx).and_then(parse_number),
            );
            let (Some(year), Some(area_ha), Some(production_tons)) = parsed else {
                report.dropped_unparsable += 1;
                continue;
            };

            if area_ha <= 0.0 || production_tons < 0.0 || year < self.config.min_year {
                report.dropped_invalid += 1;
                continue;
            }

            let county = raw.cell(row, county_idx).unwrap_or_default().trim();
            let crop = raw.cell(row, crop_idx).unwrap_or_default().trim();
            let mut record = CanonicalRecord::new(county, crop, year, area_ha, production_tons);
            record.production_system = system_idx
                .and_then(|idx| raw.cell(row, idx))
                .map(|s| s.trim().to_string());
            records.push(record);
        }

        records
    }
}

fn normalize_headers(raw: &mut RawTable) {
    for header in raw.headers.iter_mut() {
        *header = normalize_column_name(header);
    }
}

/// Finite float, or `None`
fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer year; whole-valued floats such as `2015.0` are accepted
fn parse_year(value: &str) -> Option<i32> {
    let value = value.trim();
    if let Ok(year) = value.parse::<i32>() {
        return Some(year);
    }
    parse_number(value)
        .filter(|v| v.fract() == 0.0 && *v >= i32::MIN as f64 && *v <= i32::MAX as f64)
        .map(|v| v as i32)
}

/// Clean a CSV byte stream with the default configuration
pub fn clean<R: Read>(reader: R) -> Result<CanonicalTable, CleaningError> {
    Cleaner::default().clean_reader(reader)
}

/// Clean a CSV file with the default configuration
pub fn clean_path<P: AsRef<Path>>(path: P) -> Result<CanonicalTable, CleaningError> {
    Cleaner::default().clean_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HEADER: &str = "Country,Admin 1,Product,Harvest Year,Area,Production\n";

    fn csv(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_kisumu_maize_scenario() {
        let table = clean(csv(&["Kenya,Kisumu,Maize,2015,10,50"]).as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        let record = &table.records()[0];
        assert_eq!(record.county, "Kisumu");
        assert_eq!(record.crop, "Maize");
        assert_eq!(record.year, 2015);
        assert_eq!(record.area_ha, 10.0);
        assert_eq!(record.production_tons, 50.0);
        assert_eq!(record.yield_ton_per_ha, 5.0);
        assert_eq!(record.production_system, None);
    }

    #[test]
    fn test_zero_area_dropped() {
        let table = clean(
            csv(&[
                "Kenya,Kisumu,Maize,2015,0,50",
                "Kenya,Kisumu,Beans,2015,2,3",
            ])
            .as_bytes(),
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].crop, "Beans");
    }

    #[test]
    fn test_only_zero_area_is_data_unavailable() {
        let err = clean(csv(&["Kenya,Kisumu,Maize,2015,0,50"]).as_bytes()).unwrap_err();
        assert!(matches!(err, CleaningError::DataUnavailable { rows_read: 1 }));
    }

    #[test]
    fn test_country_filter_case_insensitive() {
        let table = clean(
            csv(&[
                " KENYA ,Nakuru,Maize,2016,4,8",
                "Uganda,Gulu,Maize,2016,4,8",
                "kenya,Kisumu,Maize,2016,2,2",
            ])
            .as_bytes(),
        )
        .unwrap();
        assert_eq!(table.counties(), vec!["Kisumu", "Nakuru"]);
    }

    #[test]
    fn test_no_country_column_keeps_all_rows() {
        let data = "county,crop,year,area_ha,production_tons\nKisumu,Maize,2015,10,50\n";
        let table = clean(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_junk_values_drop_rows() {
        let (table, report) = Cleaner::default()
            .clean_with_report(
                RawTable::from_reader(
                    csv(&[
                        "Kenya,None,Maize,2015,10,50",
                        "Kenya,Kisumu,N/A,2015,10,50",
                        "Kenya,Kisumu,Maize,null,10,50",
                        "Kenya,Kisumu,Maize,2015,  ,50",
                        "Kenya,Kisumu,Maize,2015,10,-",
                        "Kenya,Kisumu,TBD,2015,10,50",
                        "Kenya,Kisumu,Maize,2015,10,40",
                    ])
                    .as_bytes(),
                )
                .unwrap(),
            )
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(report.dropped_incomplete, 6);
        assert_eq!(report.rows_kept, 1);
    }

    #[test]
    fn test_unparsable_numbers_dropped() {
        let (table, report) = Cleaner::default()
            .clean_with_report(
                RawTable::from_reader(
                    csv(&[
                        "Kenya,Kisumu,Maize,twenty,10,50",
                        "Kenya,Kisumu,Maize,2015,ten,50",
                        "Kenya,Kisumu,Maize,2015,10,inf",
                        "Kenya,Kisumu,Maize,2015.0,10,50",
                    ])
                    .as_bytes(),
                )
                .unwrap(),
            )
            .unwrap();
        assert_eq!(report.dropped_unparsable, 3);
        assert_eq!(table.records()[0].year, 2015);
    }

    #[test]
    fn test_validity_filter() {
        let (table, report) = Cleaner::default()
            .clean_with_report(
                RawTable::from_reader(
                    csv(&[
                        "Kenya,Kisumu,Maize,2015,-3,50",
                        "Kenya,Kisumu,Maize,2015,3,-1",
                        "Kenya,Kisumu,Maize,1995,3,6",
                        "Kenya,Kisumu,Maize,2015,3,0",
                    ])
                    .as_bytes(),
                )
                .unwrap(),
            )
            .unwrap();
        assert_eq!(report.dropped_invalid, 3);
        assert_eq!(table.records()[0].yield_ton_per_ha, 0.0);
    }

    #[test]
    fn test_missing_critical_column_is_data_unavailable() {
        let data = "Country,Admin 1,Product,Harvest Year,Area\nKenya,Kisumu,Maize,2015,10\n";
        let err = clean(data.as_bytes()).unwrap_err();
        assert!(matches!(err, CleaningError::DataUnavailable { .. }));
    }

    #[test]
    fn test_raw_yield_is_ignored() {
        let data = "county,crop,year,area_ha,production_tons,yield_ton_per_ha\n\
                    Kisumu,Maize,2015,4,10,999\n";
        let table = clean(data.as_bytes()).unwrap();
        assert_eq!(table.records()[0].yield_ton_per_ha, 2.5);
    }

    #[test]
    fn test_alias_does_not_clobber_canonical_column() {
        let data = "county,admin_1,crop,year,area_ha,production_tons\n\
                    Kisumu,Western,Maize,2015,4,10\n";
        let table = clean(data.as_bytes()).unwrap();
        assert_eq!(table.records()[0].county, "Kisumu");
    }

    #[test]
    fn test_production_system_kept_and_junk_nulled() {
        let data = "country,admin_1,product,harvest_year,area,production,crop_production_system\n\
                    Kenya,Kisumu,Maize,2015,4,10,All (PS)\n\
                    Kenya,Kisumu,Maize,2016,4,12,Irrigated\n";
        let table = clean(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].production_system, None);
        assert_eq!(
            table.records()[1].production_system.as_deref(),
            Some("Irrigated")
        );
    }

    #[test]
    fn test_clean_is_idempotent() {
        let first = clean(
            csv(&[
                "Kenya,Kisumu,Maize,2015,3,7",
                "Kenya,Nakuru,Beans,2018,0.3,0.1",
                "Kenya,Nakuru,Beans,2019,0,1",
            ])
            .as_bytes(),
        )
        .unwrap();

        let mut written = Vec::new();
        first.write_csv(&mut written).unwrap();
        let second = clean(written.as_slice()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_clean_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kenya_only.csv");
        std::fs::write(&path, csv(&["Kenya,Kisumu,Maize,2015,10,50"])).unwrap();
        let table = clean_path(&path).unwrap();
        assert_eq!(table.len(), 1);
    }

    fn cell() -> impl Strategy<Value = String> {
        prop_oneof![
            (-50.0f64..500.0).prop_map(|v| v.to_string()),
            Just("0".to_string()),
            Just("n/a".to_string()),
            Just("".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn prop_output_rows_valid(rows in prop::collection::vec((cell(), cell(), 2000i32..2024), 1..40)) {
            let lines: Vec<String> = rows
                .iter()
                .map(|(area, production, year)| format!("Kenya,Kisumu,Maize,{year},{area},{production}"))
                .collect();
            let text = csv(&lines.iter().map(String::as_str).collect::<Vec<_>>());

            match clean(text.as_bytes()) {
                Ok(table) => {
                    for r in table.records() {
                        prop_assert!(r.area_ha > 0.0);
                        prop_assert!(r.production_tons >= 0.0);
                        prop_assert_eq!(r.yield_ton_per_ha, r.production_tons / r.area_ha);
                    }
                }
                Err(err) => {
                    let is_data_unavailable = matches!(err, CleaningError::DataUnavailable { .. });
                    prop_assert!(is_data_unavailable);
                    let any_valid = rows.iter().any(|(area, production, _)| {
                        matches!(
                            (area.parse::<f64>(), production.parse::<f64>()),
                            (Ok(a), Ok(p)) if a > 0.0 && p >= 0.0
                        )
                    });
                    prop_assert!(!any_valid);
                }
            }
        }
    }
}
