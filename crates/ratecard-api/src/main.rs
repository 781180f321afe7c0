//! Ratecard API Server
//!
//! Author: hephaex@gmail.com

use ratecard_api::{create_router, state::AppState};
use ratecard_core::config::{AppConfig, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "ratecard_api=debug,ratecard_ingest=debug,tower_http=debug";

/// `RUST_LOG`, else a configured level, else the crate defaults
fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if logging.level == LoggingConfig::default().level {
            EnvFilter::new(DEFAULT_FILTER)
        } else {
            EnvFilter::new(&logging.level)
        }
    })
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(logging));
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    let store = ratecard_core::store::open(&config.database).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store));
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Ratecard API Server starting on http://{}", addr);
    tracing::info!("Upload a ratesheet at http://{}/upload", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
