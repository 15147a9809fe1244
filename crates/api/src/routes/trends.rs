//! Trend Routes

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use yield_analytics::{county_yield_summary, CountyYield, TrendAnalysis, TrendDirection, YearlyYield};

use crate::{ApiError, SharedState};

#[derive(Debug, Deserialize)]
pub struct TrendRequest {
    pub county: String,
    pub crop: String,
}

#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub county: String,
    pub crop: String,
    pub trend: Vec<YearlyYield>,
    pub slope: f64,
    pub direction: TrendDirection,
    pub trend_note: String,
}

impl From<TrendAnalysis> for TrendResponse {
    fn from(analysis: TrendAnalysis) -> Self {
        Self {
            trend_note: analysis.direction.note().to_string(),
            county: analysis.county,
            crop: analysis.crop,
            trend: analysis.points,
            slope: analysis.slope,
            direction: analysis.direction,
        }
    }
}

/// Yield trend of one crop in one county
pub async fn get_trend(
    State(state): State<SharedState>,
    payload: Result<Json<TrendRequest>, JsonRejection>,
) -> Result<Json<TrendResponse>, ApiError> {
    let Json(request) = payload?;
    let state = state.read().await;
    let analysis = TrendAnalysis::compute(
        &state.table,
        &request.county,
        &request.crop,
        &state.trend_policy,
    )?;
    Ok(Json(analysis.into()))
}

#[derive(Debug, Deserialize)]
pub struct CountyQuery {
    pub crop: String,
}

#[derive(Debug, Serialize)]
pub struct CountyYieldResponse {
    pub crop: String,
    pub data: Vec<CountyYield>,
}

/// Mean yield per county for a crop
pub async fn yield_by_county(
    State(state): State<SharedState>,
    Query(params): Query<CountyQuery>,
) -> Result<Json<CountyYieldResponse>, ApiError> {
    let state = state.read().await;
    let data = county_yield_summary(&state.table, &params.crop)?;
    Ok(Json(CountyYieldResponse {
        crop: params.crop,
        data,
    }))
}
