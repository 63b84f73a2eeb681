//! Historical race results table.
//!
//! The table is an optional input to the feature builder: it supplies the
//! name-to-id mappings and the per-horse / per-jockey / per-pair aggregates.
//! Records are sorted by race date ascending once at construction and never
//! mutated afterward.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use tracing::warn;

/// One past race result for a horse/jockey pair.
#[derive(Debug, Clone)]
pub struct HistoricalRecord {
    pub horse_id: u32,
    pub horse_name: String,
    pub jockey_id: u32,
    pub jockey: String,
    pub odds: f64,
    /// Finish rank, 1 = won
    pub rank: u32,
    pub race_date: NaiveDate,
    pub time_seconds: Option<f64>,
}

/// Jockey performance within one odds bracket.
#[derive(Debug, Clone, Copy)]
pub struct BracketStats {
    /// Fraction of rides in the bracket that won
    pub win_rate: f64,
    /// Mean odds paid on wins minus 1 (net return per unit staked)
    pub roi: f64,
}

/// Joint horse-jockey performance.
#[derive(Debug, Clone, Copy)]
pub struct PairStats {
    pub rides_together: usize,
    pub avg_rank_together: f64,
}

/// Past race results, sorted by race date ascending.
#[derive(Debug, Clone, Default)]
pub struct HistoryTable {
    records: Vec<HistoricalRecord>,
}

impl HistoryTable {
    pub fn new(mut records: Vec<HistoricalRecord>) -> Self {
        // Stable sort keeps same-day records in input order, so repeated
        // builds over the same table stay deterministic.
        records.sort_by_key(|r| r.race_date);
        Self { records }
    }

    /// Load a results table from CSV.
    ///
    /// Expected columns: horse_id, horse_name, jockey_id, jockey, odds, rank,
    /// race_date (YYYY-MM-DD), and optionally time_seconds. Rows with null
    /// required fields, negative odds, or a zero rank are skipped.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))
            .context("Failed to open history CSV")?
            .finish()
            .context("Failed to read history CSV")?;

        let horse_id_col = df.column("horse_id")?.i64()?;
        let horse_name_col = df.column("horse_name")?.str()?;
        let jockey_id_col = df.column("jockey_id")?.i64()?;
        let jockey_col = df.column("jockey")?.str()?;
        let odds_col = df.column("odds")?.f64()?;
        let rank_col = df.column("rank")?.i64()?;
        let date_col = df.column("race_date")?.str()?;
        let time_col = df.column("time_seconds").ok().and_then(|c| c.f64().ok());

        let mut records = Vec::with_capacity(df.height());
        let mut skipped = 0usize;

        for i in 0..df.height() {
            let row = (
                horse_id_col.get(i),
                horse_name_col.get(i),
                jockey_id_col.get(i),
                jockey_col.get(i),
                odds_col.get(i),
                rank_col.get(i),
                date_col.get(i).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            );

            match row {
                (
                    Some(horse_id),
                    Some(horse_name),
                    Some(jockey_id),
                    Some(jockey),
                    Some(odds),
                    Some(rank),
                    Some(race_date),
                ) if horse_id > 0 && jockey_id > 0 && odds >= 0.0 && rank > 0 => {
                    records.push(HistoricalRecord {
                        horse_id: horse_id as u32,
                        horse_name: horse_name.to_string(),
                        jockey_id: jockey_id as u32,
                        jockey: jockey.to_string(),
                        odds,
                        rank: rank as u32,
                        race_date,
                        time_seconds: time_col.as_ref().and_then(|c| c.get(i)),
                    });
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("skipped {} invalid rows in history CSV", skipped);
        }

        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// (horse_name, horse_id) pairs in date order; later races win on
    /// conflicting names.
    pub fn horse_ids(&self) -> impl Iterator<Item = (&str, u32)> {
        self.records.iter().map(|r| (r.horse_name.as_str(), r.horse_id))
    }

    /// (jockey, jockey_id) pairs in date order.
    pub fn jockey_ids(&self) -> impl Iterator<Item = (&str, u32)> {
        self.records.iter().map(|r| (r.jockey.as_str(), r.jockey_id))
    }

    pub fn max_horse_id(&self) -> u32 {
        self.records.iter().map(|r| r.horse_id).max().unwrap_or(0)
    }

    pub fn max_jockey_id(&self) -> u32 {
        self.records.iter().map(|r| r.jockey_id).max().unwrap_or(0)
    }

    /// Mean finish rank over the horse's `n` chronologically most recent
    /// records, or None when the horse has no history.
    pub fn last_races_avg(&self, horse_id: u32, n: usize) -> Option<f64> {
        let ranks: Vec<u32> = self
            .records
            .iter()
            .rev()
            .filter(|r| r.horse_id == horse_id)
            .take(n)
            .map(|r| r.rank)
            .collect();

        if ranks.is_empty() {
            return None;
        }
        Some(ranks.iter().sum::<u32>() as f64 / ranks.len() as f64)
    }

    /// Win rate and ROI for a jockey's rides whose odds fall in [min, max),
    /// or None when the bracket has no supporting rides.
    pub fn jockey_bracket_stats(&self, jockey_id: u32, min: f64, max: f64) -> Option<BracketStats> {
        let mut count = 0usize;
        let mut wins = 0usize;
        let mut winning_odds = 0.0f64;

        for r in &self.records {
            if r.jockey_id != jockey_id || r.odds < min || r.odds >= max {
                continue;
            }
            count += 1;
            if r.rank == 1 {
                wins += 1;
                winning_odds += r.odds;
            }
        }

        if count == 0 {
            return None;
        }
        Some(BracketStats {
            win_rate: wins as f64 / count as f64,
            roi: winning_odds / count as f64 - 1.0,
        })
    }

    /// Joint record of a horse-jockey pair, or None when they have never
    /// raced together.
    pub fn pair_stats(&self, horse_id: u32, jockey_id: u32) -> Option<PairStats> {
        let ranks: Vec<u32> = self
            .records
            .iter()
            .filter(|r| r.horse_id == horse_id && r.jockey_id == jockey_id)
            .map(|r| r.rank)
            .collect();

        if ranks.is_empty() {
            return None;
        }
        Some(PairStats {
            rides_together: ranks.len(),
            avg_rank_together: ranks.iter().sum::<u32>() as f64 / ranks.len() as f64,
        })
    }
}
