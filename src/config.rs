//! Service configuration
//!
//! Everything is read from process environment. Only the upstream credential
//! has no default; its absence is reported once per batch, not at startup, so
//! the health endpoint stays reachable on a misconfigured deployment.

use crate::error::{AppError, Result};

/// Symbols served when a request names none
pub const DEFAULT_SYMBOLS: [&str; 10] = [
    "AAPL", "MSFT", "AMZN", "NVDA", "TSLA", "META", "GOOGL", "BRK.B", "JPM", "JNJ",
];

/// Path value that selects the in-process cache store
pub const MEMORY_STORE: &str = ":memory:";

/// Service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backing table for cached quotes
    pub cache_table_name: String,

    /// Seconds a cached quote stays readable
    pub cache_ttl_seconds: i64,

    /// Alpha Vantage API key
    pub api_key: Option<String>,

    /// Alpha Vantage query endpoint
    pub provider_base_url: String,

    /// SQLite file for the cache, or `:memory:`
    pub cache_db_path: String,

    pub host: String,
    pub port: u16,

    /// Inbound requests allowed per second
    pub api_rate_limit: u32,

    /// Seconds between expired-row sweeps, 0 disables
    pub reap_interval_secs: u64,

    pub default_symbols: Vec<String>,
}

fn default_cache_table_name() -> String {
    "stock-price-cache".to_string()
}

fn default_cache_ttl() -> i64 {
    45
}

fn default_provider_base_url() -> String {
    "https://www.alphavantage.co/query".to_string()
}

fn default_cache_db_path() -> String {
    "quote-cache.db".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_rate_limit() -> u32 {
    100
}

fn default_reap_interval() -> u64 {
    300
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let cache_table_name = var("CACHE_TABLE_NAME").unwrap_or_else(default_cache_table_name);
        validate_table_name(&cache_table_name)?;

        let cache_ttl_seconds = var("CACHE_TTL")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|ttl| *ttl >= 0)
            .unwrap_or_else(default_cache_ttl);

        let port = match var("SERVER_PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT '{}': {}", v, e)))?,
            None => default_port(),
        };

        let default_symbols = var("DEFAULT_SYMBOLS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|symbols| !symbols.is_empty())
            .unwrap_or_else(default_symbols);

        Ok(Self {
            cache_table_name,
            cache_ttl_seconds,
            api_key: var("ALPHA_VANTAGE_API_KEY"),
            provider_base_url: var("ALPHA_VANTAGE_BASE_URL")
                .unwrap_or_else(default_provider_base_url),
            cache_db_path: var("CACHE_DB_PATH").unwrap_or_else(default_cache_db_path),
            host: var("SERVER_HOST").unwrap_or_else(default_host),
            port,
            api_rate_limit: var("API_RATE_LIMIT")
                .and_then(|v| v.parse().ok())
                .filter(|rate| *rate > 0)
                .unwrap_or_else(default_api_rate_limit),
            reap_interval_secs: var("CACHE_REAP_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_reap_interval),
            default_symbols,
        })
    }

    /// Whether the cache lives in process memory instead of SQLite
    pub fn uses_memory_store(&self) -> bool {
        self.cache_db_path == MEMORY_STORE
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_table_name: default_cache_table_name(),
            cache_ttl_seconds: default_cache_ttl(),
            api_key: None,
            provider_base_url: default_provider_base_url(),
            cache_db_path: default_cache_db_path(),
            host: default_host(),
            port: default_port(),
            api_rate_limit: default_api_rate_limit(),
            reap_interval_secs: default_reap_interval(),
            default_symbols: default_symbols(),
        }
    }
}

/// Table names are interpolated into SQL, so restrict them
pub(crate) fn validate_table_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(AppError::Config(format!("Invalid CACHE_TABLE_NAME '{}'", name)))
    }
}
