//! Feature builder for model input.
//!
//! Turns raw race entries (plus an optional historical results table) into a
//! fixed-schema feature table: one fully populated row per entry, in entry
//! order. Horse and jockey names are reconciled to stable integer ids, real
//! aggregates are computed where history supports them, and every remaining
//! gap is backfilled with a deterministic default so a row is never emitted
//! with a missing value.

use ndarray::Array2;
use tracing::debug;

use crate::error::{validate_entries, PipelineError};
use crate::history::HistoryTable;
use crate::types::Entry;

/// Odds brackets used to bucket jockey historical performance, [min, max).
pub const ODDS_BRACKETS: [(f64, f64); 5] = [
    (0.0, 2.0),
    (2.0, 5.0),
    (5.0, 10.0),
    (10.0, 20.0),
    (20.0, f64::INFINITY),
];

/// Number of fixed feature columns
pub const NUM_FEATURES: usize = 17;

/// Fully populated numeric feature vector for one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub horse_id: u32,
    pub jockey_id: u32,
    pub horse_weight: f32,
    /// Weight change since last race as a percentage of body weight
    pub weight_change_rate: f32,
    /// Mean finish rank over the horse's most recent <=5 races
    pub last_5_races_avg: f32,
    pub rides_together: f32,
    pub avg_rank_together: f32,
    /// Jockey win rate per odds bracket, ODDS_BRACKETS order
    pub win_rate: [f32; 5],
    /// Jockey net return per unit staked per odds bracket
    pub roi: [f32; 5],
    /// True when any column came from a backfill default rather than real
    /// data. Observability only, not a model input.
    pub backfilled: bool,
}

impl FeatureRow {
    /// Convert to array in model input order (matches config::FEATURE_NAMES)
    pub fn to_array(&self) -> [f32; NUM_FEATURES] {
        [
            self.horse_id as f32,
            self.jockey_id as f32,
            self.horse_weight,
            self.weight_change_rate,
            self.last_5_races_avg,
            self.rides_together,
            self.avg_rank_together,
            self.win_rate[0],
            self.win_rate[1],
            self.win_rate[2],
            self.win_rate[3],
            self.win_rate[4],
            self.roi[0],
            self.roi[1],
            self.roi[2],
            self.roi[3],
            self.roi[4],
        ]
    }
}

/// Backfill values for features with no supporting data
struct Defaults;

impl Defaults {
    const UNKNOWN_JOCKEY_ID: u32 = 1;
    const HORSE_WEIGHT: f32 = 800.0;
    const WEIGHT_CHANGE_RATE: f32 = 0.0;
    const LAST_5_RACES_AVG: f32 = 4.5;
    const RIDES_TOGETHER: f32 = 2.0;
    const AVG_RANK_TOGETHER: f32 = 4.0;

    /// Bracket win-rate fallback, decaying as the lower bound rises
    fn win_rate(bracket_min: f64) -> f32 {
        (0.3 * (1.0 / (bracket_min + 1.0))) as f32
    }

    /// Bracket ROI fallback, less negative as the lower bound rises
    fn roi(bracket_min: f64) -> f32 {
        (-0.1 + 0.05 * bracket_min) as f32
    }
}

/// Name-to-id assignment. Ids seeded from history resolve to their historical
/// value; unseen names get sequential ids in first-occurrence order.
struct IdBook {
    ids: std::collections::HashMap<String, u32>,
    next: u32,
}

impl IdBook {
    fn new() -> Self {
        Self {
            ids: std::collections::HashMap::new(),
            next: 1,
        }
    }

    fn seeded<'a>(known: impl Iterator<Item = (&'a str, u32)>, max_id: u32) -> Self {
        let mut ids = std::collections::HashMap::new();
        for (name, id) in known {
            ids.insert(name.to_string(), id);
        }
        Self { ids, next: max_id + 1 }
    }

    fn resolve(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.next;
        self.next += 1;
        self.ids.insert(name.to_string(), id);
        id
    }
}

/// Build one feature row per entry, in entry order.
///
/// Fails only on schema violations (empty entry list, missing horse name);
/// missing history or missing individual aggregates are backfilled.
pub fn build_features(
    entries: &[Entry],
    history: Option<&HistoryTable>,
) -> Result<Vec<FeatureRow>, PipelineError> {
    validate_entries(entries)?;

    let mut horses = match history {
        Some(h) => IdBook::seeded(h.horse_ids(), h.max_horse_id()),
        None => IdBook::new(),
    };
    let mut jockeys = match history {
        Some(h) => IdBook::seeded(h.jockey_ids(), h.max_jockey_id()),
        None => IdBook::new(),
    };

    let rows = entries
        .iter()
        .map(|entry| build_row(entry, &mut horses, &mut jockeys, history))
        .collect();

    Ok(rows)
}

fn build_row(
    entry: &Entry,
    horses: &mut IdBook,
    jockeys: &mut IdBook,
    history: Option<&HistoryTable>,
) -> FeatureRow {
    let mut backfilled = false;

    let horse_id = horses.resolve(entry.horse_name.trim());

    let jockey_id = match entry.jockey.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => jockeys.resolve(name),
        _ => {
            backfilled = true;
            Defaults::UNKNOWN_JOCKEY_ID
        }
    };

    let horse_weight = match entry.horse_weight {
        Some(w) => w as f32,
        None => {
            backfilled = true;
            Defaults::HORSE_WEIGHT
        }
    };

    // Computed directly from the entry whenever both fields are present,
    // independent of history.
    let weight_change_rate = match (entry.weight_change, entry.horse_weight) {
        (Some(change), Some(weight)) if weight > 0 => change as f32 / weight as f32 * 100.0,
        _ => {
            backfilled = true;
            Defaults::WEIGHT_CHANGE_RATE
        }
    };

    let last_5_races_avg = match history.and_then(|h| h.last_races_avg(horse_id, 5)) {
        Some(avg) => avg as f32,
        None => {
            backfilled = true;
            Defaults::LAST_5_RACES_AVG
        }
    };

    let (rides_together, avg_rank_together) =
        match history.and_then(|h| h.pair_stats(horse_id, jockey_id)) {
            Some(pair) => (pair.rides_together as f32, pair.avg_rank_together as f32),
            None => {
                backfilled = true;
                (Defaults::RIDES_TOGETHER, Defaults::AVG_RANK_TOGETHER)
            }
        };

    let mut win_rate = [0.0f32; 5];
    let mut roi = [0.0f32; 5];
    for (i, &(min, max)) in ODDS_BRACKETS.iter().enumerate() {
        match history.and_then(|h| h.jockey_bracket_stats(jockey_id, min, max)) {
            Some(stats) => {
                win_rate[i] = stats.win_rate as f32;
                roi[i] = stats.roi as f32;
            }
            None => {
                backfilled = true;
                win_rate[i] = Defaults::win_rate(min);
                roi[i] = Defaults::roi(min);
            }
        }
    }

    if backfilled {
        debug!(horse = %entry.horse_name, "some features backfilled with defaults");
    }

    FeatureRow {
        horse_id,
        jockey_id,
        horse_weight,
        weight_change_rate,
        last_5_races_avg,
        rides_together,
        avg_rank_together,
        win_rate,
        roi,
        backfilled,
    }
}

/// Stack feature rows into the (n_rows, NUM_FEATURES) matrix the scorer
/// consumes.
pub fn feature_matrix(rows: &[FeatureRow]) -> Array2<f32> {
    let mut matrix = Array2::<f32>::zeros((rows.len(), NUM_FEATURES));
    for (i, row) in rows.iter().enumerate() {
        for (j, value) in row.to_array().into_iter().enumerate() {
            matrix[[i, j]] = value;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoricalRecord;
    use chrono::NaiveDate;

    fn entry(name: &str, jockey: &str) -> Entry {
        Entry {
            horse_name: name.to_string(),
            jockey: if jockey.is_empty() {
                None
            } else {
                Some(jockey.to_string())
            },
            ..Default::default()
        }
    }

    fn record(
        horse_id: u32,
        horse_name: &str,
        jockey_id: u32,
        jockey: &str,
        odds: f64,
        rank: u32,
        date: &str,
    ) -> HistoricalRecord {
        HistoricalRecord {
            horse_id,
            horse_name: horse_name.to_string(),
            jockey_id,
            jockey: jockey.to_string(),
            odds,
            rank,
            race_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time_seconds: None,
        }
    }

    #[test]
    fn test_one_row_per_entry_without_history() {
        let entries = vec![entry("A", "X"), entry("B", "Y"), entry("C", "X")];
        let rows = build_features(&entries, None).unwrap();

        assert_eq!(rows.len(), 3);
        // First-occurrence ids starting at 1
        assert_eq!(rows[0].horse_id, 1);
        assert_eq!(rows[1].horse_id, 2);
        assert_eq!(rows[2].horse_id, 3);
        assert_eq!(rows[0].jockey_id, 1);
        assert_eq!(rows[1].jockey_id, 2);
        assert_eq!(rows[2].jockey_id, 1);

        for row in &rows {
            assert!(row.backfilled);
            for value in row.to_array() {
                assert!(value.is_finite());
            }
        }
    }

    #[test]
    fn test_weight_change_rate() {
        let mut e = entry("A", "X");
        e.horse_weight = Some(800);
        e.weight_change = Some(40);
        let rows = build_features(&[e], None).unwrap();

        assert_eq!(rows[0].horse_weight, 800.0);
        assert_eq!(rows[0].weight_change_rate, 5.0);
    }

    #[test]
    fn test_backfill_defaults_without_history() {
        let rows = build_features(&[entry("A", "")], None).unwrap();
        let row = &rows[0];

        assert_eq!(row.jockey_id, 1);
        assert_eq!(row.horse_weight, 800.0);
        assert_eq!(row.weight_change_rate, 0.0);
        assert_eq!(row.last_5_races_avg, 4.5);
        assert_eq!(row.rides_together, 2.0);
        assert_eq!(row.avg_rank_together, 4.0);

        // Bracket [5,10): win_rate = 0.3/6, roi = -0.1 + 0.25
        assert!((row.win_rate[2] - 0.05).abs() < 1e-6);
        assert!((row.roi[2] - 0.15).abs() < 1e-6);
        // Bracket [0,2): win_rate = 0.3, roi = -0.1
        assert!((row.win_rate[0] - 0.3).abs() < 1e-6);
        assert!((row.roi[0] + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_id_reconciliation_with_history() {
        let table = HistoryTable::new(vec![
            record(3, "A", 5, "X", 2.0, 1, "2024-01-01"),
            record(8, "B", 2, "Y", 3.0, 2, "2024-01-02"),
        ]);
        let entries = vec![entry("B", "Y"), entry("新馬", "X"), entry("もう一頭", "新騎手")];
        let rows = build_features(&entries, Some(&table)).unwrap();

        // Known names keep historical ids
        assert_eq!(rows[0].horse_id, 8);
        assert_eq!(rows[0].jockey_id, 2);
        // Unseen names continue from max id + 1 in first-occurrence order
        assert_eq!(rows[1].horse_id, 9);
        assert_eq!(rows[2].horse_id, 10);
        assert_eq!(rows[1].jockey_id, 5);
        assert_eq!(rows[2].jockey_id, 6);
    }

    #[test]
    fn test_id_assignment_deterministic() {
        let entries = vec![entry("A", "X"), entry("B", "Y"), entry("A", "Z")];
        let first = build_features(&entries, None).unwrap();
        let second = build_features(&entries, None).unwrap();

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.horse_id, b.horse_id);
            assert_eq!(a.jockey_id, b.jockey_id);
        }
        // Same name resolves to the same id within one build
        assert_eq!(first[0].horse_id, first[2].horse_id);
    }

    #[test]
    fn test_aggregates_from_history() {
        let table = HistoryTable::new(vec![
            record(1, "A", 1, "X", 1.5, 1, "2024-01-01"),
            record(1, "A", 1, "X", 3.0, 3, "2024-01-02"),
            record(1, "A", 2, "Y", 8.0, 5, "2024-01-03"),
        ]);
        let rows = build_features(&[entry("A", "X")], Some(&table)).unwrap();
        let row = &rows[0];

        // Mean rank of the horse's three races
        assert!((row.last_5_races_avg - 3.0).abs() < 1e-6);
        // Pair A/X raced twice with ranks 1 and 3
        assert_eq!(row.rides_together, 2.0);
        assert!((row.avg_rank_together - 2.0).abs() < 1e-6);
        // Jockey X bracket [0,2): one ride, won at 1.5 -> roi 0.5
        assert!((row.win_rate[0] - 1.0).abs() < 1e-6);
        assert!((row.roi[0] - 0.5).abs() < 1e-6);
        // Bracket [2,5): one ride, lost -> win rate 0, roi -1
        assert!((row.win_rate[1] - 0.0).abs() < 1e-6);
        assert!((row.roi[1] + 1.0).abs() < 1e-6);
        // Bracket [10,20): no support, backfilled
        assert!((row.win_rate[3] - Defaults::win_rate(10.0)).abs() < 1e-6);
        assert!((row.roi[3] - 0.4).abs() < 1e-6);
        assert!(row.backfilled);
    }

    #[test]
    fn test_history_row_fully_supported_not_backfilled() {
        let mut records = vec![record(1, "A", 1, "X", 1.5, 1, "2024-01-01")];
        for &(min, _) in ODDS_BRACKETS.iter().skip(1) {
            records.push(record(2, "B", 1, "X", min, 2, "2024-01-02"));
        }
        let table = HistoryTable::new(records);

        let mut e = entry("A", "X");
        e.horse_weight = Some(900);
        e.weight_change = Some(-9);
        let rows = build_features(&[e], Some(&table)).unwrap();

        assert!(!rows[0].backfilled);
        assert!((rows[0].weight_change_rate + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_entries_rejected() {
        let err = build_features(&[], None).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_missing_horse_name_rejected() {
        let err = build_features(&[entry("", "X")], None).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_feature_matrix_shape() {
        let rows = build_features(&[entry("A", "X"), entry("B", "Y")], None).unwrap();
        let matrix = feature_matrix(&rows);

        assert_eq!(matrix.shape(), &[2, NUM_FEATURES]);
        assert_eq!(matrix[[0, 0]], 1.0);
        assert_eq!(matrix[[1, 0]], 2.0);
    }
}
