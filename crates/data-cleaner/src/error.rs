//! Cleaning Error Types

use thiserror::Error;

/// Errors during record cleaning
#[derive(Debug, Error)]
pub enum CleaningError {
    /// Source could not be parsed as tabular data
    #[error("Malformed source: {0}")]
    MalformedSource(String),

    /// Source parsed but no row survived filtering
    #[error("No data available after cleaning ({rows_read} rows read)")]
    DataUnavailable { rows_read: usize },

    /// Writing the canonical table failed
    #[error("Write failed: {0}")]
    WriteFailed(String),
}

impl From<csv::Error> for CleaningError {
    fn from(err: csv::Error) -> Self {
        CleaningError::MalformedSource(err.to_string())
    }
}

impl From<std::io::Error> for CleaningError {
    fn from(err: std::io::Error) -> Self {
        CleaningError::MalformedSource(err.to_string())
    }
}
