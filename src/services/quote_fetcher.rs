//! Quote Fetcher
//!
//! Cache-aside lookup for a single symbol: cache first, then one upstream
//! attempt, populating the cache only on success.

use crate::cache::{day_key, QuoteCache};
use crate::providers::types::QuoteRecord;
use crate::providers::{ProviderError, QuoteProvider};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Terminal result of one symbol fetch
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    /// Served from cache, `cached = true`
    Hit(QuoteRecord),
    /// Fetched from upstream and cached, `cached = false`
    Fresh(QuoteRecord),
    Failed(ProviderError),
}

impl QuoteOutcome {
    pub fn record(&self) -> Option<&QuoteRecord> {
        match self {
            QuoteOutcome::Hit(record) | QuoteOutcome::Fresh(record) => Some(record),
            QuoteOutcome::Failed(_) => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, QuoteOutcome::Hit(_))
    }
}

/// Single-symbol fetcher over a cache and a provider
#[derive(Clone)]
pub struct QuoteFetcher {
    cache: QuoteCache,
    provider: Arc<dyn QuoteProvider>,
    ttl_seconds: i64,
}

impl QuoteFetcher {
    pub fn new(cache: QuoteCache, provider: Arc<dyn QuoteProvider>, ttl_seconds: i64) -> Self {
        Self {
            cache,
            provider,
            ttl_seconds,
        }
    }

    pub fn provider(&self) -> &Arc<dyn QuoteProvider> {
        &self.provider
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    /// Fetch one normalized symbol as of `now`
    pub async fn fetch_one(&self, symbol: &str, now: DateTime<Utc>) -> QuoteOutcome {
        let day = day_key(now);
        let now_secs = now.timestamp();

        if let Some(record) = self.cache.get(symbol, &day, now_secs).await {
            info!("Cache HIT for {}", symbol);
            return QuoteOutcome::Hit(record.with_cached(true));
        }

        info!("Cache MISS for {}", symbol);

        match self.provider.fetch(symbol).await {
            Ok(record) => {
                let record = record.with_cached(false);
                self.cache
                    .put(symbol, &day, &record, self.ttl_seconds, now_secs)
                    .await;
                QuoteOutcome::Fresh(record)
            }
            Err(e) => {
                warn!(
                    "Failed to fetch quote for {} from {} ({}): {}",
                    symbol,
                    self.provider.id(),
                    e.kind(),
                    e
                );
                QuoteOutcome::Failed(e)
            }
        }
    }
}
