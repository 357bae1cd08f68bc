//! In-process cache store

use super::{CacheEntry, QuoteStore};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Cache store backed by a sharded concurrent map
#[derive(Debug, Default)]
pub struct MemoryQuoteStore {
    entries: DashMap<(String, String), CacheEntry>,
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl QuoteStore for MemoryQuoteStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, symbol: &str, day: &str) -> Result<Option<CacheEntry>> {
        Ok(self
            .entries
            .get(&(symbol.to_string(), day.to_string()))
            .map(|r| r.clone()))
    }

    async fn save(&self, entry: &CacheEntry) -> Result<()> {
        self.entries
            .insert((entry.symbol.clone(), entry.day.clone()), entry.clone());
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> Result<usize> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        Ok(before.saturating_sub(self.entries.len()))
    }
}
