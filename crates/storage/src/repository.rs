//! Repository Implementation

use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// A served prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: i64,
    pub timestamp_ms: i64,
    pub county: Option<String>,
    pub crop: String,
    pub year: i32,
    pub area_ha: f64,
    pub predicted_yield: f64,
}

/// Filters for listing predictions
#[derive(Debug, Clone, Default)]
pub struct PredictionQuery<'a> {
    pub county: Option<&'a str>,
    pub crop: Option<&'a str>,
    pub limit: usize,
}

struct Inner {
    predictions: VecDeque<PredictionRecord>,
    next_id: i64,
}

/// Repository for prediction history (in-memory)
pub struct Repository {
    inner: Mutex<Inner>,
    /// Oldest records are evicted beyond this
    max_records: usize,
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    /// Create a repository keeping at most `max_records`
    pub fn with_capacity(max_records: usize) -> Self {
        info!("Creating in-memory prediction repository (max {})", max_records);
        Self {
            inner: Mutex::new(Inner {
                predictions: VecDeque::with_capacity(max_records.min(1000)),
                next_id: 1,
            }),
            max_records: max_records.max(1),
        }
    }

    /// Insert a prediction; the stored id is returned
    pub fn insert_prediction(&self, mut record: PredictionRecord) -> Result<i64, StorageError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;

        record.id = inner.next_id;
        inner.next_id += 1;

        while inner.predictions.len() >= self.max_records {
            inner.predictions.pop_front();
        }

        let id = record.id;
        inner.predictions.push_back(record);
        debug!("Inserted prediction with ID {}", id);
        Ok(id)
    }

    /// Newest-first predictions matching the query
    pub fn get_predictions(
        &self,
        query: &PredictionQuery<'_>,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;

        Ok(inner
            .predictions
            .iter()
            .rev()
            .filter(|p| query.county.map_or(true, |c| p.county.as_deref() == Some(c)))
            .filter(|p| query.crop.map_or(true, |c| p.crop == c))
            .take(query.limit)
            .cloned()
            .collect())
    }

    /// Look up one prediction
    pub fn get_prediction(&self, id: i64) -> Result<PredictionRecord, StorageError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;

        inner
            .predictions
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    /// Get total prediction count
    pub fn prediction_count(&self) -> usize {
        self.inner.lock().map(|i| i.predictions.len()).unwrap_or(0)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(county: &str, crop: &str) -> PredictionRecord {
        PredictionRecord {
            id: 0,
            timestamp_ms: 1_700_000_000_000,
            county: Some(county.to_string()),
            crop: crop.to_string(),
            year: 2024,
            area_ha: 10.0,
            predicted_yield: 2.5,
        }
    }

    #[test]
    fn test_prediction_insert() {
        let repo = Repository::new();
        let id = repo.insert_prediction(record("Kisumu", "Maize")).unwrap();
        assert_eq!(id, 1);

        let preds = repo
            .get_predictions(&PredictionQuery {
                limit: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].crop, "Maize");
        assert_eq!(repo.get_prediction(1).unwrap().id, 1);
    }

    #[test]
    fn test_filters_newest_first() {
        let repo = Repository::new();
        repo.insert_prediction(record("Kisumu", "Maize")).unwrap();
        repo.insert_prediction(record("Nakuru", "Maize")).unwrap();
        repo.insert_prediction(record("Kisumu", "Beans")).unwrap();

        let kisumu = repo
            .get_predictions(&PredictionQuery {
                county: Some("Kisumu"),
                crop: None,
                limit: 10,
            })
            .unwrap();
        assert_eq!(kisumu.iter().map(|p| p.id).collect::<Vec<_>>(), vec![3, 1]);

        let maize = repo
            .get_predictions(&PredictionQuery {
                county: None,
                crop: Some("Maize"),
                limit: 1,
            })
            .unwrap();
        assert_eq!(maize[0].id, 2);
    }

    #[test]
    fn test_retention_limit() {
        let repo = Repository::with_capacity(5);
        for _ in 0..10 {
            repo.insert_prediction(record("Kisumu", "Maize")).unwrap();
        }
        assert_eq!(repo.prediction_count(), 5);
        assert!(matches!(repo.get_prediction(1), Err(StorageError::NotFound)));
        assert!(repo.get_prediction(10).is_ok());
    }
}
