//! Quote cache
//!
//! Entries are partitioned by `(symbol, UTC day)` and carry an absolute
//! expiry. An entry written late in the day becomes unreachable at midnight
//! even if its TTL has not elapsed, because lookups use the new day key.
//! Expired rows are never deleted here; reads ignore them and the backing
//! store reaps them on its own schedule.

pub mod memory;

use crate::error::Result;
use crate::providers::types::QuoteRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

pub use memory::MemoryQuoteStore;

/// Stored cache row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub symbol: String,
    /// UTC calendar day the entry was written, `YYYY-MM-DD`
    pub day: String,
    pub data: QuoteRecord,
    pub expires_at: i64,
    pub written_at: i64,
}

impl CacheEntry {
    /// Readable strictly before `expires_at`
    pub fn is_live(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// Backing storage for cache entries
///
/// Implementations must allow concurrent access to distinct keys. Concurrent
/// saves of the same key may race; the last write wins.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Store name for logs (e.g., "sqlite", "memory")
    fn name(&self) -> &'static str;

    /// Load the row for a key regardless of expiry
    async fn load(&self, symbol: &str, day: &str) -> Result<Option<CacheEntry>>;

    /// Insert or overwrite the row for the entry's key
    async fn save(&self, entry: &CacheEntry) -> Result<()>;

    /// Delete rows with `expires_at <= now`, returning how many went
    async fn purge_expired(&self, now: i64) -> Result<usize>;
}

/// Cache partition key for a point in time
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Cache-aside view over a [`QuoteStore`]
///
/// Storage failures never escape: a failed read is a miss and a failed
/// write is logged and dropped.
#[derive(Clone)]
pub struct QuoteCache {
    store: Arc<dyn QuoteStore>,
}

impl QuoteCache {
    pub fn new(store: Arc<dyn QuoteStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn QuoteStore> {
        self.store.clone()
    }

    /// Return the cached record if one exists and `expires_at > now`
    pub async fn get(&self, symbol: &str, day: &str, now: i64) -> Option<QuoteRecord> {
        match self.store.load(symbol, day).await {
            Ok(Some(entry)) if entry.is_live(now) => Some(entry.data),
            Ok(Some(entry)) => {
                debug!(
                    "Cache entry for {} expired {}s ago",
                    symbol,
                    now - entry.expires_at
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                error!("Error reading from cache for {}: {}", symbol, e);
                None
            }
        }
    }

    /// Store a record with `expires_at = now + ttl_seconds`
    pub async fn put(
        &self,
        symbol: &str,
        day: &str,
        record: &QuoteRecord,
        ttl_seconds: i64,
        now: i64,
    ) {
        let entry = CacheEntry {
            symbol: symbol.to_string(),
            day: day.to_string(),
            data: record.clone().with_cached(false),
            expires_at: now.saturating_add(ttl_seconds),
            written_at: now,
        };

        match self.store.save(&entry).await {
            Ok(()) => debug!("Saved {} to cache with TTL: {}s", symbol, ttl_seconds),
            Err(e) => error!("Error saving to cache for {}: {}", symbol, e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::TimeZone;

    /// Store whose every operation fails
    pub(crate) struct BrokenStore;

    #[async_trait]
    impl QuoteStore for BrokenStore {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn load(&self, _symbol: &str, _day: &str) -> Result<Option<CacheEntry>> {
            Err(AppError::Internal("store offline".to_string()))
        }

        async fn save(&self, _entry: &CacheEntry) -> Result<()> {
            Err(AppError::Internal("store offline".to_string()))
        }

        async fn purge_expired(&self, _now: i64) -> Result<usize> {
            Err(AppError::Internal("store offline".to_string()))
        }
    }

    fn quote(symbol: &str, price: f64) -> QuoteRecord {
        let mut q = QuoteRecord::new(symbol);
        q.price = price;
        q
    }

    fn memory_cache() -> QuoteCache {
        QuoteCache::new(Arc::new(MemoryQuoteStore::new()))
    }

    #[test]
    fn test_day_key_is_utc_date() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(day_key(now), "2024-03-09");
        assert_eq!(day_key(now + chrono::Duration::seconds(1)), "2024-03-10");
    }

    #[tokio::test]
    async fn test_get_within_ttl() {
        let cache = memory_cache();
        cache.put("AAPL", "2024-03-09", &quote("AAPL", 190.0), 45, 1_000).await;

        let hit = cache.get("AAPL", "2024-03-09", 1_044).await.unwrap();
        assert_eq!(hit.price, 190.0);
        assert!(!hit.cached);
    }

    #[tokio::test]
    async fn test_expiry_is_strict() {
        let cache = memory_cache();
        cache.put("AAPL", "2024-03-09", &quote("AAPL", 190.0), 45, 1_000).await;

        assert!(cache.get("AAPL", "2024-03-09", 1_045).await.is_none());
        assert!(cache.get("AAPL", "2024-03-09", 2_000).await.is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_never_hits() {
        let cache = memory_cache();
        cache.put("AAPL", "2024-03-09", &quote("AAPL", 190.0), 0, 1_000).await;

        assert!(cache.get("AAPL", "2024-03-09", 1_000).await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = memory_cache();
        cache.put("AAPL", "2024-03-09", &quote("AAPL", 190.0), 45, 1_000).await;
        cache.put("AAPL", "2024-03-09", &quote("AAPL", 191.5), 45, 1_010).await;

        let hit = cache.get("AAPL", "2024-03-09", 1_050).await.unwrap();
        assert_eq!(hit.price, 191.5);
    }

    #[tokio::test]
    async fn test_other_day_is_a_miss() {
        let cache = memory_cache();
        cache.put("AAPL", "2024-03-09", &quote("AAPL", 190.0), 3_600, 1_000).await;

        assert!(cache.get("AAPL", "2024-03-10", 1_001).await.is_none());
        assert!(cache.get("MSFT", "2024-03-09", 1_001).await.is_none());
    }

    #[tokio::test]
    async fn test_store_errors_degrade() {
        let cache = QuoteCache::new(Arc::new(BrokenStore));

        cache.put("AAPL", "2024-03-09", &quote("AAPL", 190.0), 45, 1_000).await;
        assert!(cache.get("AAPL", "2024-03-09", 1_001).await.is_none());
    }
}
