//! Metadata Routes

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use data_cleaner::{CleaningReport, RawTable};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{ApiError, SharedState};

/// Banner
pub async fn index(State(state): State<SharedState>) -> Json<Value> {
    let state = state.read().await;
    Json(json!({
        "message": "MavunoWatch API is running",
        "version": state.version,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    /// Restrict `crops` to those grown in this county
    pub county: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub counties: Vec<String>,
    pub crops: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub production_systems: Vec<String>,
    pub min_year: i32,
    pub max_year: i32,
}

/// Sorted distinct counties and crops of the loaded table
pub async fn get_metadata(
    State(state): State<SharedState>,
    Query(params): Query<MetadataQuery>,
) -> Result<Json<MetadataResponse>, ApiError> {
    let state = state.read().await;
    let table = &state.table;

    let crops = match params.county.as_deref() {
        Some(county) => {
            let crops = table.crops_in_county(county);
            if crops.is_empty() {
                return Err(ApiError::NotFound(format!("No data found for county {}", county)));
            }
            crops
        }
        None => table.crops(),
    };

    Ok(Json(MetadataResponse {
        counties: table.counties(),
        crops,
        production_systems: table.production_systems(),
        min_year: table.min_year(),
        max_year: table.max_year(),
    }))
}

#[derive(Debug, Serialize)]
pub struct CleanResponse {
    pub report: CleaningReport,
    pub counties: Vec<String>,
    pub crops: Vec<String>,
    /// First rows of the cleaned table
    pub preview: Vec<data_cleaner::CanonicalRecord>,
}

const PREVIEW_ROWS: usize = 5;

/// Clean an uploaded CSV body without replacing the served table
pub async fn clean_upload(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<CleanResponse>, ApiError> {
    let state = state.read().await;
    let raw = RawTable::from_reader(body.as_ref())?;
    let (table, report) = state.cleaner.clean_with_report(raw)?;

    Ok(Json(CleanResponse {
        report,
        counties: table.counties(),
        crops: table.crops(),
        preview: table.records().iter().take(PREVIEW_ROWS).cloned().collect(),
    }))
}
