//! Finish-order prediction and result assembly.
//!
//! Converts raw model scores into a stable rank ordering with a bounded
//! confidence percentage, and falls back to popularity-based ranking (clearly
//! flagged) when no scoring function is available.

use std::cmp::Ordering;
use tracing::warn;

use crate::error::PipelineError;
use crate::features::{build_features, feature_matrix, FeatureRow};
use crate::history::HistoryTable;
use crate::model::Scorer;
use crate::types::{Entry, PredictRequest, PredictionSource, RankedHorse, RankedResult};

/// Confidence for a raw rank-like score in a field of `field_size` horses.
///
/// Maps a perfect score of 1 to 100 and a last-place score toward 0; an
/// affine function of predicted rank, not a calibrated probability. Clamped
/// because fallback scores can exceed the field size.
pub fn confidence_for_score(score: f32, field_size: usize) -> f64 {
    let n = field_size as f64;
    (100.0 * (1.0 - (score as f64 - 1.0) / n)).clamp(0.0, 100.0)
}

/// Rank horses by ascending raw score, ties broken by input order.
fn rank_by_scores(entries: &[Entry], scores: &[f32]) -> Vec<RankedHorse> {
    let n = entries.len();
    let mut order: Vec<usize> = (0..n).collect();
    // Stable sort keeps input order on ties (and on NaN scores)
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    order
        .into_iter()
        .enumerate()
        .map(|(pos, i)| RankedHorse {
            horse_name: entries[i].horse_name.clone(),
            jockey: entries[i].jockey.clone(),
            predicted_rank: pos + 1,
            confidence: confidence_for_score(scores[i], n),
        })
        .collect()
}

/// Degraded mode: rank by public popularity (1 = most popular first, missing
/// popularity last, ties by input order) with a fixed confidence ladder.
fn rank_by_popularity(entries: &[Entry]) -> Vec<RankedHorse> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by_key(|&i| entries[i].popularity.unwrap_or(u32::MAX));

    order
        .into_iter()
        .enumerate()
        .map(|(pos, i)| {
            let rank = pos + 1;
            RankedHorse {
                horse_name: entries[i].horse_name.clone(),
                jockey: entries[i].jockey.clone(),
                predicted_rank: rank,
                confidence: (90 - 10 * (rank as i64 - 1)).max(10) as f64,
            }
        })
        .collect()
}

/// Score the feature table and rank the field.
///
/// Errors with `ScoringUnavailable` when no scorer is supplied, the scoring
/// call fails, or the score vector does not match the table.
pub fn rank_with_model(
    entries: &[Entry],
    rows: &[FeatureRow],
    scorer: Option<&dyn Scorer>,
) -> Result<Vec<RankedHorse>, PipelineError> {
    let scorer = scorer.ok_or_else(|| {
        PipelineError::ScoringUnavailable("no model loaded".to_string())
    })?;

    let scores = scorer
        .score(feature_matrix(rows))
        .map_err(|e| PipelineError::ScoringUnavailable(format!("{:#}", e)))?;

    if scores.len() != rows.len() {
        return Err(PipelineError::ScoringUnavailable(format!(
            "scorer returned {} scores for {} rows",
            scores.len(),
            rows.len()
        )));
    }

    Ok(rank_by_scores(entries, &scores))
}

/// Run the full pipeline for one race: feature building, scoring, ranking,
/// result assembly.
///
/// Stateless and free of I/O: a pure function of the request, the history
/// table, and the scorer. Schema violations surface as hard failures;
/// scoring unavailability is absorbed into the flagged popularity fallback.
pub fn run_pipeline(
    req: &PredictRequest,
    history: Option<&HistoryTable>,
    scorer: Option<&dyn Scorer>,
) -> Result<RankedResult, PipelineError> {
    let rows = build_features(&req.horses, history)?;

    let (ranked_horses, source) = match rank_with_model(&req.horses, &rows, scorer) {
        Ok(ranked) => (ranked, PredictionSource::Model),
        Err(PipelineError::ScoringUnavailable(reason)) => {
            warn!(%reason, "falling back to popularity ranking");
            (rank_by_popularity(&req.horses), PredictionSource::PopularityFallback)
        }
        Err(e) => return Err(e),
    };

    Ok(RankedResult {
        race_name: req.race_name.clone(),
        distance: req.distance,
        ranked_horses,
        source,
    })
}
