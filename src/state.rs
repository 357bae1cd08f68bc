//! Application state management

use crate::cache::{MemoryQuoteStore, QuoteCache, QuoteStore};
use crate::config::AppConfig;
use crate::db::sqlite::SqliteDb;
use crate::error::Result;
use crate::providers::{AlphaVantageProvider, QuoteProvider};
use crate::services::BatchFetchOrchestrator;
use std::path::Path;
use std::sync::Arc;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: AppConfig,

    /// Cache backing store, also swept by the reaper
    pub store: Arc<dyn QuoteStore>,

    /// Quote pipeline
    pub orchestrator: BatchFetchOrchestrator,
}

impl AppState {
    /// Build state from configuration: SQLite or memory store, Alpha Vantage provider
    pub fn new(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn QuoteStore> = if config.uses_memory_store() {
            tracing::info!("Using in-memory quote cache");
            Arc::new(MemoryQuoteStore::new())
        } else {
            let path = Path::new(&config.cache_db_path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(
                "Quote cache: {:?}, table '{}'",
                path,
                config.cache_table_name
            );
            Arc::new(SqliteDb::new(path, &config.cache_table_name)?)
        };

        let provider = Arc::new(AlphaVantageProvider::new(
            config.api_key.clone(),
            config.provider_base_url.clone(),
        )?);

        if !provider.is_configured() {
            tracing::warn!("ALPHA_VANTAGE_API_KEY not configured, quote requests will fail");
        }

        Ok(Self::with_parts(config, store, provider))
    }

    /// Assemble state from explicit parts
    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn QuoteStore>,
        provider: Arc<dyn QuoteProvider>,
    ) -> Self {
        let cache = QuoteCache::new(store.clone());
        let orchestrator =
            BatchFetchOrchestrator::new(cache, provider, config.cache_ttl_seconds);

        Self {
            config,
            store,
            orchestrator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_selected() {
        let config = AppConfig {
            cache_db_path: ":memory:".to_string(),
            ..AppConfig::default()
        };
        let state = AppState::new(config).unwrap();
        assert_eq!(state.store.name(), "memory");
    }

    #[test]
    fn test_sqlite_store_created_in_nested_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("cache.db");
        let config = AppConfig {
            cache_db_path: path.to_string_lossy().to_string(),
            api_key: Some("demo".to_string()),
            ..AppConfig::default()
        };

        let state = AppState::new(config).unwrap();
        assert_eq!(state.store.name(), "sqlite");
        assert!(path.exists());
        assert!(state.orchestrator.fetcher().provider().is_configured());
    }
}
