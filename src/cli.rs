//! CLI commands for banei-api.
//!
//! Supports the API server mode, one-shot file prediction, and browsing the
//! saved-prediction history.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::history::HistoryTable;
use crate::model::{create_shared_scorer, SharedScorer};
use crate::predictor::run_pipeline;
use crate::storage;
use crate::types::{PredictRequest, PredictionSource, RankedResult};

#[derive(Parser)]
#[command(name = "banei-api")]
#[command(version, about = "Banei racing finish-order prediction API and CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },

    /// Run prediction on a race JSON file
    Predict {
        /// Path to race data JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Historical results CSV for aggregate features
        #[arg(long)]
        history: Option<PathBuf>,

        /// Model path override
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Output format (json, table)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Save the result to the history directory
        #[arg(long)]
        save: bool,
    },

    /// List saved predictions
    History,
}

/// Run CLI prediction from file.
pub fn run_predict(
    input: PathBuf,
    history_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    format: String,
    save: bool,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;

    if let Some(path) = model_path {
        config.model.path = path.to_string_lossy().to_string();
    }

    // A missing model is not fatal: the pipeline downgrades to the flagged
    // popularity fallback.
    let scorer: Option<SharedScorer> = match create_shared_scorer(&config.model.path) {
        Ok(s) => {
            eprintln!("Model loaded from: {}", config.model.path);
            Some(s)
        }
        Err(e) => {
            eprintln!("Model unavailable ({e:#}); using popularity fallback");
            None
        }
    };

    let history = match history_path
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| config.history.csv_path.clone())
    {
        Some(path) => {
            let table = HistoryTable::from_csv(&path)?;
            eprintln!("Loaded {} historical records from: {}", table.len(), path);
            Some(table)
        }
        None => None,
    };

    let input_json = std::fs::read_to_string(&input)?;
    let req: PredictRequest = serde_json::from_str(&input_json)?;

    eprintln!("Processing race: {} ({} horses)", req.race_name, req.horses.len());

    let result = run_pipeline(&req, history.as_ref(), scorer.as_deref())?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        "table" => {
            print_table(&result);
        }
        _ => {
            eprintln!("Unknown format: {}. Using JSON.", format);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    if save {
        let path = storage::save_result(Path::new(&config.history.data_dir), &result)?;
        eprintln!("Saved to: {}", path.display());
    }

    Ok(())
}

/// Print prediction results in table format.
fn print_table(result: &RankedResult) {
    println!("Race: {} ({}m)", result.race_name, result.distance);
    if result.source == PredictionSource::PopularityFallback {
        println!("(popularity fallback - no model signal)");
    }
    println!();

    for horse in &result.ranked_horses {
        println!(
            "  {:2}. {} ({}) confidence {:.1}%",
            horse.predicted_rank,
            horse.horse_name,
            horse.jockey.as_deref().unwrap_or("-"),
            horse.confidence
        );
    }
}

/// List saved predictions from the history directory.
pub fn run_history() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let entries = storage::list_results(Path::new(&config.history.data_dir))?;

    if entries.is_empty() {
        println!("No saved predictions in {}", config.history.data_dir);
        return Ok(());
    }

    for entry in entries {
        let date = entry
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {}  {}", date, entry.race_name);
    }

    Ok(())
}
