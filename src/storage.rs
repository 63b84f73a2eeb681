//! Saved-prediction files.
//!
//! Each prediction is persisted as pretty-printed JSON named
//! `<YYYYMMDD>_<race name>.json` under the history directory, and the listing
//! operation feeds the history view.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::RankedResult;

/// One saved prediction, as shown in the history listing.
#[derive(Debug, Clone)]
pub struct SavedPrediction {
    pub date: Option<NaiveDate>,
    pub race_name: String,
    pub path: PathBuf,
}

/// Write a prediction result to the history directory.
pub fn save_result(data_dir: &Path, result: &RankedResult) -> Result<PathBuf> {
    fs::create_dir_all(data_dir).context("Failed to create history directory")?;

    let date = Local::now().format("%Y%m%d");
    let race = result.race_name.replace(' ', "_");
    let path = data_dir.join(format!("{}_{}.json", date, race));

    let json = serde_json::to_string_pretty(result)?;
    fs::write(&path, json).context("Failed to write prediction file")?;

    info!("saved prediction to {}", path.display());
    Ok(path)
}

/// List saved predictions, most recent file name first.
pub fn list_results(data_dir: &Path) -> Result<Vec<SavedPrediction>> {
    if !data_dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(data_dir).context("Failed to read history directory")? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => continue,
        };
        let result: RankedResult = match serde_json::from_str(&content) {
            Ok(r) => r,
            Err(_) => continue,
        };

        let date = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.split('_').next())
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok());

        entries.push(SavedPrediction {
            date,
            race_name: result.race_name,
            path,
        });
    }

    entries.sort_by(|a, b| b.path.cmp(&a.path));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PredictionSource, RankedHorse};

    fn sample_result() -> RankedResult {
        RankedResult {
            race_name: "ばんえい記念 第1レース".to_string(),
            distance: 200,
            ranked_horses: vec![RankedHorse {
                horse_name: "キンタロウ".to_string(),
                jockey: Some("鈴木".to_string()),
                predicted_rank: 1,
                confidence: 100.0,
            }],
            source: PredictionSource::Model,
        }
    }

    #[test]
    fn test_save_and_list_round_trip() {
        let dir = std::env::temp_dir().join("banei_storage_test");
        fs::remove_dir_all(&dir).ok();

        let path = save_result(&dir, &sample_result()).unwrap();
        assert!(path.exists());
        // Spaces in the race name become underscores
        assert!(path.file_name().unwrap().to_str().unwrap().contains("第1レース"));
        assert!(!path.file_name().unwrap().to_str().unwrap().contains(' '));

        let listed = list_results(&dir).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].race_name, "ばんえい記念 第1レース");
        assert!(listed[0].date.is_some());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = std::env::temp_dir().join("banei_storage_does_not_exist");
        assert!(list_results(&dir).unwrap().is_empty());
    }
}
