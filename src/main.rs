use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use feedloom::{Config, Database, IngestService};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = feedloom::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedloom::logging::init_console_only(&config.logging.level);
    }

    info!("Feedloom - news and video ingestion engine");
    info!("Database: {}", config.database.path);

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let service = match IngestService::from_config(&config, db.clone()) {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to start ingest service: {e}");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let handles = service.spawn(cancel.clone());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");
    cancel.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Ingest task ended abnormally: {e}");
        }
    }

    db.close().await;
    info!("Stopped");
}
