//! API Errors
//!
//! Every failure is rendered as `{"error": "..."}` with a status matching its
//! cause.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_cleaner::CleaningError;
use feature_engine::FeatureError;
use inference_engine::InferenceError;
use serde_json::json;
use storage::StorageError;
use thiserror::Error;
use tracing::{error, warn};
use yield_analytics::TrendError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Cleaning(#[from] CleaningError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Trend(#[from] TrendError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("No trained model is loaded")]
    ModelUnavailable,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Cleaning(CleaningError::MalformedSource(_)) => StatusCode::BAD_REQUEST,
            ApiError::Cleaning(CleaningError::DataUnavailable { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Cleaning(CleaningError::WriteFailed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Inference(InferenceError::Feature(FeatureError::FeatureMismatch { .. }))
            | ApiError::Inference(InferenceError::InvalidInputShape { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Trend(TrendError::NoData(_)) => StatusCode::NOT_FOUND,
            ApiError::Trend(TrendError::InsufficientData { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected ({}): {}", status, self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let mismatch = ApiError::from(InferenceError::from(FeatureError::FeatureMismatch {
            feature: "area_ha".to_string(),
            reason: "missing".to_string(),
        }));
        assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(TrendError::NoData("Maize in Kisumu".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TrendError::InsufficientData { years: 1 }).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::ModelUnavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::from(CleaningError::MalformedSource("bad".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
