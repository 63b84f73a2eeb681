//! API route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::config::{AppConfig, FEATURE_NAMES};
use crate::error::PipelineError;
use crate::features::NUM_FEATURES;
use crate::history::HistoryTable;
use crate::model::SharedScorer;
use crate::predictor::run_pipeline;
use crate::storage;
use crate::types::{
    ErrorResponse, HealthResponse, ModelInfoResponse, PredictRequest, RankedResult,
};

/// Application state shared across handlers.
pub struct AppState {
    pub scorer: Option<SharedScorer>,
    pub history: Option<HistoryTable>,
    pub config: AppConfig,
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Schema(_) => ApiError::bad_request(err.to_string()),
            PipelineError::ScoringUnavailable(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.status.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Model info endpoint.
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfoResponse> {
    Json(ModelInfoResponse {
        model_path: state.config.model.path.clone(),
        model_loaded: state.scorer.is_some(),
        num_features: NUM_FEATURES,
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
    })
}

/// Prediction endpoint.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<RankedResult>, ApiError> {
    let result = run_pipeline(&req, state.history.as_ref(), state.scorer.as_deref())?;

    if state.config.history.save_results {
        if let Err(e) = storage::save_result(Path::new(&state.config.history.data_dir), &result) {
            warn!("failed to save prediction history: {:#}", e);
        }
    }

    Ok(Json(result))
}
