//! Yield Analytics
//!
//! Trend and summary queries over a cleaned production table.

mod summary;
mod trend;

pub use summary::{county_yield_summary, CountyYield};
pub use trend::{linear_slope, TrendAnalysis, TrendDirection, TrendPolicy, YearlyYield};

use thiserror::Error;

/// Errors from analytics queries
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrendError {
    #[error("No data found for {0}")]
    NoData(String),
    #[error("Not enough data for a trend: {years} distinct year(s)")]
    InsufficientData { years: usize },
}
