//! Banei-AI prediction API
//!
//! REST API and CLI for Banei racing finish-order predictions.

use axum::{routing::get, routing::post, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use banei_api::cli::{self, Cli, Commands};
use banei_api::config::AppConfig;
use banei_api::history::HistoryTable;
use banei_api::model::create_shared_scorer;
use banei_api::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => run_server(Some(host), Some(port)).await,
        Commands::Predict {
            input,
            history,
            model,
            format,
            save,
        } => cli::run_predict(input, history, model, format, save),
        Commands::History => cli::run_history(),
    }
}

/// Run the API server.
async fn run_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banei_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("Model path: {}", config.model.path);

    // Load model; a missing model downgrades every prediction to the flagged
    // popularity fallback instead of refusing to start.
    let scorer = match create_shared_scorer(&config.model.path) {
        Ok(s) => {
            tracing::info!("Model loaded successfully");
            Some(s)
        }
        Err(e) => {
            tracing::warn!("Failed to load model ({:#}); using popularity fallback", e);
            None
        }
    };

    // Preload historical results for aggregate features
    let history = match config.history.csv_path {
        Some(ref path) => match HistoryTable::from_csv(path) {
            Ok(table) => {
                tracing::info!("Loaded {} historical records from {}", table.len(), path);
                Some(table)
            }
            Err(e) => {
                tracing::warn!("Failed to load history CSV ({:#}); aggregates will be backfilled", e);
                None
            }
        },
        None => None,
    };

    // Create application state
    let state = Arc::new(AppState {
        scorer,
        history,
        config: config.clone(),
    });

    // Build router
    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/model/info", get(routes::model_info))
        .route("/predict", post(routes::predict))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
