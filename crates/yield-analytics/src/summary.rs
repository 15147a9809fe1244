//! Per-County Yield Summary

use crate::TrendError;
use data_cleaner::CanonicalTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean yield of one crop in one county
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyYield {
    /// Title-cased county name, matching map shape names
    pub county: String,
    pub avg_yield: f64,
    pub records: usize,
}

/// Mean yield per county for a crop, sorted by county.
///
/// Counties are grouped after title-casing so `KISUMU` and `Kisumu` merge.
pub fn county_yield_summary(
    table: &CanonicalTable,
    crop: &str,
) -> Result<Vec<CountyYield>, TrendError> {
    let mut by_county: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for record in table.records().iter().filter(|r| r.crop == crop) {
        let entry = by_county
            .entry(title_case(&record.county))
            .or_insert((0.0, 0));
        entry.0 += record.yield_ton_per_ha;
        entry.1 += 1;
    }

    if by_county.is_empty() {
        return Err(TrendError::NoData(crop.to_string()));
    }

    Ok(by_county
        .into_iter()
        .map(|(county, (sum, records))| CountyYield {
            county,
            avg_yield: sum / records as f64,
            records,
        })
        .collect())
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
