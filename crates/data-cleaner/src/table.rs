//! Raw Tabular Source

use crate::error::CleaningError;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Untyped table as read from a CSV source.
///
/// Cells are `None` once junk normalization has run; on load every cell is
/// `Some`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names in source order
    pub headers: Vec<String>,
    /// One vector of cells per data row
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Build a table from headers and string rows
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Some).collect())
                .collect(),
        }
    }

    /// Read a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CleaningError> {
        let file = File::open(&path).map_err(|e| {
            CleaningError::MalformedSource(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_reader(file)
    }

    /// Read CSV from any byte stream (file, upload body, ...)
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CleaningError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(CleaningError::MalformedSource(
                "source has no header row".to_string(),
            ));
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|cell| Some(cell.to_string())).collect());
        }

        debug!("Read {} rows x {} columns", rows.len(), headers.len());
        Ok(Self { headers, rows })
    }

    /// Index of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value, `None` when missing
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
