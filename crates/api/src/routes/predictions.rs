//! Prediction Routes

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use inference_engine::{CropRecommendation, PredictionInput, RegressionMetrics, YieldPrediction};
use metrics::counter;
use serde::{Deserialize, Serialize};
use storage::{PredictionQuery, PredictionRecord};
use tracing::info;

use crate::{ApiError, SharedState};

/// Prediction plus its history id
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub prediction: YieldPrediction,
    pub prediction_id: i64,
}

/// Predict yield for one crop
pub async fn predict(
    State(state): State<SharedState>,
    payload: Result<Json<PredictionInput>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(input) = payload?;
    let state = state.read().await;
    let engine = state.engine.as_ref().ok_or(ApiError::ModelUnavailable)?;

    let prediction = engine.predict(&input)?;
    counter!("mavuno_predictions_total").increment(1);
    if !prediction.unrecognized.is_empty() {
        counter!("mavuno_unrecognized_levels_total").increment(prediction.unrecognized.len() as u64);
    }

    let prediction_id = state.repository.insert_prediction(PredictionRecord {
        id: 0,
        timestamp_ms: Utc::now().timestamp_millis(),
        county: input.county.clone(),
        crop: input.crop.clone(),
        year: input.year,
        area_ha: input.area_ha,
        predicted_yield: prediction.predicted_yield,
    })?;

    info!(
        "Prediction {}: {} in {} ({}) -> {} t/ha",
        prediction_id,
        input.crop,
        input.year,
        input.county.as_deref().unwrap_or("-"),
        prediction.predicted_yield
    );

    Ok(Json(PredictResponse {
        prediction,
        prediction_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub county: String,
    pub area_ha: f64,
    /// Defaults to the current year
    pub year: Option<i32>,
    pub production_system: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub county: String,
    pub year: i32,
    pub recommendations: Vec<CropRecommendation>,
}

/// Rank the crops grown in a county by predicted yield
pub async fn recommend(
    State(state): State<SharedState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let Json(request) = payload?;
    if request.area_ha.is_nan() || request.area_ha <= 0.0 {
        return Err(ApiError::BadRequest(format!(
            "area_ha must be positive, got {}",
            request.area_ha
        )));
    }

    let state = state.read().await;
    let engine = state.engine.as_ref().ok_or(ApiError::ModelUnavailable)?;

    let crops = state.table.crops_in_county(&request.county);
    if crops.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No data found for county {}",
            request.county
        )));
    }

    let year = request.year.unwrap_or_else(|| Utc::now().year());
    let recommendations = engine.recommend(
        &crops,
        year,
        request.area_ha,
        request.production_system.as_deref(),
    );
    counter!("mavuno_recommendations_total").increment(1);

    Ok(Json(RecommendResponse {
        county: request.county,
        year,
        recommendations,
    }))
}

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub county: Option<String>,
    pub crop: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for the history endpoint
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub data: Vec<PredictionRecord>,
    pub count: usize,
}

/// Recent predictions, newest first
pub async fn get_predictions(
    State(state): State<SharedState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let state = state.read().await;
    let data = state.repository.get_predictions(&PredictionQuery {
        county: params.county.as_deref(),
        crop: params.crop.as_deref(),
        limit: params.limit.min(500),
    })?;

    Ok(Json(HistoryResponse {
        count: data.len(),
        data,
    }))
}

/// One prediction by id
pub async fn get_prediction(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<PredictionRecord>, ApiError> {
    let state = state.read().await;
    Ok(Json(state.repository.get_prediction(id)?))
}

/// Model scored against the loaded table
#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub metrics: RegressionMetrics,
    pub feature_count: usize,
    pub base_year: Option<i32>,
}

pub async fn get_evaluation(
    State(state): State<SharedState>,
) -> Result<Json<EvaluationResponse>, ApiError> {
    let state = state.read().await;
    let engine = state.engine.as_ref().ok_or(ApiError::ModelUnavailable)?;
    let metrics = engine.evaluate(&state.table)?;
    let descriptor = engine.descriptor();

    Ok(Json(EvaluationResponse {
        metrics,
        feature_count: descriptor.declared_features.len(),
        base_year: descriptor.base_year(),
    }))
}
