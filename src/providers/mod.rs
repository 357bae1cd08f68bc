//! Upstream market-data providers

pub mod types;
pub mod alphavantage;

use async_trait::async_trait;
use thiserror::Error;
use types::QuoteRecord;

pub use alphavantage::AlphaVantageProvider;

/// Why a provider could not produce a quote for one symbol
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider API key not configured")]
    NotConfigured,

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("No data returned for {0}")]
    EmptyResult(String),

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Stable label for logs and failure listings
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured => "not_configured",
            ProviderError::UpstreamError(_) => "upstream_error",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::EmptyResult(_) => "empty_result",
            ProviderError::Timeout => "timeout",
            ProviderError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Provider trait that all quote sources implement
///
/// One call is one upstream attempt; implementations never retry.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Provider ID (e.g., "alphavantage")
    fn id(&self) -> &'static str;

    /// Whether a credential is available
    fn is_configured(&self) -> bool;

    /// Fetch the current quote for an already-normalized symbol
    async fn fetch(&self, symbol: &str) -> Result<QuoteRecord, ProviderError>;
}
