//! Batch Fetch Service
//!
//! Runs the quote fetcher over a whole symbol list concurrently and folds the
//! outcomes into one result. Per-symbol failures drop that symbol only; a
//! missing credential fails the whole batch before anything is fetched.

use super::quote_fetcher::{QuoteFetcher, QuoteOutcome};
use crate::cache::QuoteCache;
use crate::error::{AppError, Result};
use crate::providers::types::{normalize_symbol, QuoteRecord};
use crate::providers::{ProviderError, QuoteProvider};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// One symbol that produced no quote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub symbol: String,
    pub kind: String,
    pub reason: String,
}

/// Aggregated outcome of one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    /// Successful quotes in request order
    pub quotes: Vec<QuoteRecord>,
    pub failures: Vec<FetchFailure>,
    pub requested: usize,
    pub returned: usize,
    pub cached: usize,
    pub fresh: usize,
}

/// Concurrent batch orchestrator
#[derive(Clone)]
pub struct BatchFetchOrchestrator {
    fetcher: QuoteFetcher,
}

impl BatchFetchOrchestrator {
    pub fn new(cache: QuoteCache, provider: Arc<dyn QuoteProvider>, ttl_seconds: i64) -> Self {
        Self {
            fetcher: QuoteFetcher::new(cache, provider, ttl_seconds),
        }
    }

    pub fn fetcher(&self) -> &QuoteFetcher {
        &self.fetcher
    }

    /// Fetch every symbol as of one shared `now`
    pub async fn fetch_batch(&self, symbols: &[String], now: DateTime<Utc>) -> Result<BatchResult> {
        let symbols: Vec<String> = symbols
            .iter()
            .map(|s| normalize_symbol(s))
            .filter(|s| !s.is_empty())
            .collect();

        if symbols.is_empty() {
            return Ok(BatchResult::default());
        }

        let provider = self.fetcher.provider();
        if !provider.is_configured() {
            return Err(not_configured(provider.id()));
        }

        info!("Fetching quotes for symbols: {}", symbols.join(", "));

        let tasks = symbols.iter().enumerate().map(|(index, symbol)| {
            let fetcher = &self.fetcher;
            async move { (index, fetcher.fetch_one(symbol, now).await) }
        });

        let mut outcomes = join_all(tasks).await;
        outcomes.sort_by_key(|(index, _)| *index);

        if outcomes
            .iter()
            .any(|(_, outcome)| matches!(outcome, QuoteOutcome::Failed(ProviderError::NotConfigured)))
        {
            return Err(not_configured(provider.id()));
        }

        let mut result = BatchResult {
            requested: symbols.len(),
            ..BatchResult::default()
        };

        for (index, outcome) in outcomes {
            match outcome {
                QuoteOutcome::Hit(record) => {
                    result.cached += 1;
                    result.quotes.push(record);
                }
                QuoteOutcome::Fresh(record) => {
                    result.fresh += 1;
                    result.quotes.push(record);
                }
                QuoteOutcome::Failed(e) => result.failures.push(FetchFailure {
                    symbol: symbols[index].clone(),
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        result.returned = result.quotes.len();

        if result.failures.is_empty() {
            info!(
                "Successfully fetched {} out of {} quotes ({} cached, {} fresh)",
                result.returned, result.requested, result.cached, result.fresh
            );
        } else {
            warn!(
                "Successfully fetched {} out of {} quotes ({} cached, {} fresh), failed: {}",
                result.returned,
                result.requested,
                result.cached,
                result.fresh,
                result
                    .failures
                    .iter()
                    .map(|f| format!("{} ({})", f.symbol, f.kind))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(result)
    }
}

fn not_configured(provider_id: &str) -> AppError {
    AppError::Config(format!("API key for provider '{}' not configured", provider_id))
}
