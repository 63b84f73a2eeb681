//! Banei racing finish-order prediction.
//!
//! The core is a stateless pipeline: raw race entries (plus an optional
//! historical results table) are turned into a fixed-schema feature table,
//! scored by an opaque model, and assembled into a ranked, confidence-scored
//! result. The surrounding crate adds the REST API, CLI, and saved-prediction
//! storage.
//!
//! # Example
//!
//! ```no_run
//! use banei_api::predictor::run_pipeline;
//! use banei_api::types::{Entry, PredictRequest};
//!
//! let req = PredictRequest {
//!     race_name: "ばんえい記念".to_string(),
//!     distance: 200,
//!     track_condition: None,
//!     weather: None,
//!     horses: vec![Entry {
//!         horse_name: "キンタロウ".to_string(),
//!         ..Default::default()
//!     }],
//! };
//!
//! // No model and no history: every feature is backfilled and the result is
//! // flagged as a popularity fallback.
//! let result = run_pipeline(&req, None, None).unwrap();
//! println!("{}", result.ranked_horses[0].horse_name);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod history;
pub mod model;
pub mod predictor;
pub mod routes;
pub mod storage;
pub mod types;

pub use error::PipelineError;
pub use features::{build_features, feature_matrix, FeatureRow};
pub use history::{HistoricalRecord, HistoryTable};
pub use model::{Scorer, SharedScorer};
pub use predictor::run_pipeline;
pub use types::{Entry, PredictRequest, PredictionSource, RankedHorse, RankedResult};
