//! Cleaning Configuration
//!
//! Provider-specific knowledge (column aliases, junk tokens) lives here so a
//! new data source can be onboarded by supplying a different table.

use crate::columns;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cleaning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Keep only rows whose `country` equals this value (case-insensitive).
    /// Applied only when the source has a `country` column.
    pub country: Option<String>,
    /// Source column name -> canonical column name
    pub column_aliases: BTreeMap<String, String>,
    /// Placeholder values treated as missing (case-insensitive, trimmed)
    pub junk_tokens: Vec<String>,
    /// Earliest harvest year kept
    pub min_year: i32,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        let column_aliases = [
            ("admin_1", columns::COUNTY),
            ("product", columns::CROP),
            ("harvest_year", columns::YEAR),
            ("area", columns::AREA_HA),
            ("production", columns::PRODUCTION_TONS),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        let junk_tokens = [
            "none", "n/a", "na", "null", "nan", "-", "--", "\u{2014}", "all (ps)", "tbd",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            country: Some("kenya".to_string()),
            column_aliases,
            junk_tokens,
            min_year: 2000,
        }
    }
}

impl CleaningConfig {
    /// Config that keeps every country and every year
    pub fn unfiltered() -> Self {
        Self {
            country: None,
            min_year: i32::MIN,
            ..Default::default()
        }
    }

    /// Add or replace a column alias
    pub fn with_alias(mut self, from: &str, to: &str) -> Self {
        self.column_aliases
            .insert(normalize_column_name(from), to.to_string());
        self
    }

    /// Add a junk token
    pub fn with_junk_token(mut self, token: &str) -> Self {
        self.junk_tokens.push(token.trim().to_lowercase());
        self
    }

    /// Whether a raw cell value should be treated as missing
    pub fn is_junk(&self, value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || self
                .junk_tokens
                .iter()
                .any(|token| token.trim().eq_ignore_ascii_case(trimmed))
    }

    /// Canonical name for a (normalized) source column, if aliased
    pub fn alias_for(&self, column: &str) -> Option<&str> {
        self.column_aliases
            .iter()
            .find(|(from, _)| normalize_column_name(from) == column)
            .map(|(_, to)| to.as_str())
    }
}

/// Trim, lowercase and replace internal spaces with underscores
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}
