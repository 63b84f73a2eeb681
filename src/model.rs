//! Scoring function interface and ONNX-backed implementation.
//!
//! The predictor only depends on the narrow `Scorer` seam: a feature table in,
//! one raw rank-like score per row out. Production uses an ONNX regression
//! model; tests substitute mocks.

use anyhow::{Context, Result};
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Opaque scoring function: lower score means a better predicted finish.
pub trait Scorer: Send + Sync {
    /// Score the full feature table, returning one value per row in row order.
    fn score(&self, features: Array2<f32>) -> Result<Vec<f32>>;
}

/// ONNX model wrapper producing one rank-like score per horse.
pub struct OnnxScorer {
    session: Mutex<Session>,
}

impl OnnxScorer {
    /// Load an ONNX model from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path.as_ref())
            .context("Failed to load ONNX model")?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Scorer for OnnxScorer {
    fn score(&self, features: Array2<f32>) -> Result<Vec<f32>> {
        let n_rows = features.nrows();

        let input_tensor = Tensor::from_array(features)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock session: {}", e))?;

        let outputs = session.run(ort::inputs![input_tensor])?;

        // Regression output: either [n] or [n, 1]
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract score tensor")?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let n_cols = match dims.as_slice() {
            [rows] if *rows as usize == n_rows => 1,
            [rows, cols] if *rows as usize == n_rows && *cols >= 1 => *cols as usize,
            _ => anyhow::bail!(
                "Unexpected output shape {:?}, expected [{}] or [{}, 1]",
                dims,
                n_rows,
                n_rows
            ),
        };

        Ok((0..n_rows).map(|i| data[i * n_cols]).collect())
    }
}

/// Thread-safe scorer handle for web handlers.
pub type SharedScorer = Arc<dyn Scorer>;

/// Load the ONNX model and wrap it for sharing.
pub fn create_shared_scorer<P: AsRef<Path>>(path: P) -> Result<SharedScorer> {
    let scorer = OnnxScorer::load(path)?;
    Ok(Arc::new(scorer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FEATURE_NAMES;
    use crate::features::NUM_FEATURES;

    #[test]
    fn test_feature_names_match_width() {
        assert_eq!(FEATURE_NAMES.len(), NUM_FEATURES);
        assert_eq!(FEATURE_NAMES[0], "horse_id");
        assert_eq!(FEATURE_NAMES[16], "roi_20_inf");
    }

    #[test]
    fn test_missing_model_file_errors() {
        assert!(OnnxScorer::load("does/not/exist.onnx").is_err());
    }
}
