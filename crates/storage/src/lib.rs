//! Storage Layer
//!
//! Keeps a bounded history of served yield predictions.

mod repository;

pub use repository::{PredictionQuery, PredictionRecord, Repository};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
}
