//! Request and response types for the Banei prediction API.

use serde::{Deserialize, Serialize};

/// One horse's raw race-day data.
///
/// The horse name is the only required field; identity across races is the
/// name, identity within a race is the running number. Everything else is
/// backfilled by the feature builder when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    pub horse_name: String,
    #[serde(default)]
    pub jockey: Option<String>,
    /// Starting-gate (frame) number
    #[serde(default)]
    pub frame_number: Option<u32>,
    /// Running number within the race
    #[serde(default)]
    pub horse_number: Option<u32>,
    /// Public-popularity rank (1 = most popular)
    #[serde(default)]
    pub popularity: Option<u32>,
    /// Body weight in kg
    #[serde(default)]
    pub horse_weight: Option<u32>,
    /// Weight change since the last race, in kg
    #[serde(default)]
    pub weight_change: Option<i32>,
    #[serde(default)]
    pub odds: Option<f64>,
}

/// Prediction request for one race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub race_name: String,
    pub distance: u32,
    /// Track condition (良/稍重/重/不良); echoed through, not a model input
    #[serde(default)]
    pub track_condition: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    pub horses: Vec<Entry>,
}

/// How a ranking was produced. Fallback results carry no real predictive
/// signal and must stay distinguishable downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    PopularityFallback,
}

/// One horse in the finish-order prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedHorse {
    pub horse_name: String,
    #[serde(default)]
    pub jockey: Option<String>,
    /// 1 = predicted winner
    pub predicted_rank: usize,
    /// 0-100, non-increasing with rank within one race
    pub confidence: f64,
}

/// Final ordered prediction output for a race. Created once per request and
/// immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub race_name: String,
    pub distance: u32,
    pub ranked_horses: Vec<RankedHorse>,
    pub source: PredictionSource,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Model info response
#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub model_path: String,
    pub model_loaded: bool,
    pub num_features: usize,
    pub feature_names: Vec<String>,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
