//! Expired cache row reaper
//!
//! Reads already ignore expired rows; this only keeps the backing store from
//! growing without bound. Sweeps run on a fixed interval in a background task.

use crate::cache::QuoteStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Periodic sweeper for expired cache rows
pub struct CacheReaper {
    store: Arc<dyn QuoteStore>,
    interval: Duration,
}

impl CacheReaper {
    /// Create a new reaper
    pub fn new(store: Arc<dyn QuoteStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Delete everything expired as of `now`, logging instead of failing
    pub async fn sweep(&self, now: i64) -> usize {
        match self.store.purge_expired(now).await {
            Ok(0) => {
                debug!("Cache reaper: nothing expired in {} store", self.store.name());
                0
            }
            Ok(removed) => {
                info!(
                    "Cache reaper: removed {} expired rows from {} store",
                    removed,
                    self.store.name()
                );
                removed
            }
            Err(e) => {
                warn!("Cache reaper sweep failed: {}", e);
                0
            }
        }
    }

    /// Start the reaper loop on the tokio runtime
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Cache reaper started, sweeping every {}s",
                self.interval.as_secs()
            );

            let mut ticker = tokio::time::interval(self.interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.sweep(Utc::now().timestamp()).await;
            }
        })
    }
}
