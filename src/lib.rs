//! Stock Data Fetcher - cached batch quote service
//!
//! Serves current equity quotes for a list of ticker symbols. Each symbol is
//! looked up in a per-day cache first and fetched from Alpha Vantage on a
//! miss; fresh results are written back with a short TTL.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod providers;
pub mod scheduler;
pub mod services;
pub mod state;

use api::ApiServer;
use config::AppConfig;
use scheduler::CacheReaper;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging, honoring `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_data_fetcher=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build state, start the reaper and the API server, then serve until Ctrl-C
pub async fn run(config: AppConfig) -> error::Result<()> {
    tracing::info!("Starting stock data fetcher...");

    let state = Arc::new(AppState::new(config)?);

    let reaper = if state.config.reap_interval_secs > 0 {
        let reaper = CacheReaper::new(
            state.store.clone(),
            Duration::from_secs(state.config.reap_interval_secs),
        );
        tracing::info!("Cache reaper started");
        Some(reaper.start())
    } else {
        None
    };

    let mut server = ApiServer::new(state);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    server.stop();
    if let Some(handle) = reaper {
        handle.abort();
    }

    Ok(())
}
