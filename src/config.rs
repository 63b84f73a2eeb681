//! Configuration for the Banei API.

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: String,
}

fn default_model_path() -> String {
    "data/models/banei_rank_model.onnx".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
        }
    }
}

/// Historical data and saved-prediction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Optional CSV of past race results, loaded at startup for aggregate
    /// features
    #[serde(default)]
    pub csv_path: Option<String>,
    /// Directory where prediction results are saved as JSON
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Whether the server saves each prediction to the history directory
    #[serde(default = "default_save_results")]
    pub save_results: bool,
}

fn default_data_dir() -> String {
    "data/history".to_string()
}

fn default_save_results() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            data_dir: default_data_dir(),
            save_results: default_save_results(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file, and
    /// environment variables (BANEI_SERVER_PORT, etc.)
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("BANEI")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; 17] = [
    "horse_id",
    "jockey_id",
    "horse_weight",
    "weight_change_rate",
    "last_5_races_avg",
    "rides_together",
    "avg_rank_together",
    "win_rate_0_2",
    "win_rate_2_5",
    "win_rate_5_10",
    "win_rate_10_20",
    "win_rate_20_inf",
    "roi_0_2",
    "roi_2_5",
    "roi_5_10",
    "roi_10_20",
    "roi_20_inf",
];
