//! Request and response shapes for the quote endpoints
//!
//! Requests arrive either as query strings, as a direct JSON body, or as an
//! API-Gateway style envelope carrying `queryStringParameters`. All three
//! resolve to one symbol list.

use crate::providers::types::QuoteRecord;
use crate::services::{BatchResult, FetchFailure};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Accept `true`, `"true"`, `"1"` or `"yes"`; anything else is false
fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleBool {
        Bool(bool),
        Str(String),
        Other(serde_json::Value),
    }

    Ok(match FlexibleBool::deserialize(deserializer)? {
        FlexibleBool::Bool(b) => b,
        FlexibleBool::Str(s) => truthy(&s),
        FlexibleBool::Other(_) => false,
    })
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Split a comma-separated list; blank pieces are dropped
pub fn split_symbols(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Query-string parameters, also used inside the gateway envelope
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    #[serde(default)]
    pub symbols: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub include_failures: bool,
}

impl QueryParams {
    pub fn wants_failures(&self) -> bool {
        self.include_failures
    }

    /// Explicit symbols, or None when absent or blank
    fn explicit_symbols(&self) -> Option<Vec<String>> {
        self.symbols
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(split_symbols)
    }
}

/// `symbols` as either a JSON array or a comma-separated string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SymbolsParam {
    List(Vec<String>),
    Csv(String),
}

/// JSON body of `POST /quotes`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub symbols: Option<SymbolsParam>,
    #[serde(default)]
    pub query_string_parameters: Option<QueryParams>,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub include_failures: bool,
}

impl QuoteRequest {
    /// Resolve the symbol list. Envelope symbols win over body symbols;
    /// absent or blank-string symbols fall back to `defaults`, while an
    /// explicit empty array stays empty.
    pub fn resolve_symbols(&self, defaults: &[String]) -> Vec<String> {
        if let Some(symbols) = self
            .query_string_parameters
            .as_ref()
            .and_then(QueryParams::explicit_symbols)
        {
            return symbols;
        }

        match &self.symbols {
            Some(SymbolsParam::List(list)) => list
                .iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(SymbolsParam::Csv(csv)) if !csv.trim().is_empty() => split_symbols(csv),
            _ => defaults.to_vec(),
        }
    }

    pub fn wants_failures(&self) -> bool {
        self.include_failures
            || self
                .query_string_parameters
                .as_ref()
                .map(QueryParams::wants_failures)
                .unwrap_or(false)
    }
}

impl From<QueryParams> for QuoteRequest {
    fn from(params: QueryParams) -> Self {
        Self {
            symbols: None,
            include_failures: params.wants_failures(),
            query_string_parameters: Some(params),
        }
    }
}

/// ISO-8601 UTC with millisecond precision
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Successful batch response
#[derive(Debug, Clone, Serialize)]
pub struct QuotesResponse {
    pub success: bool,
    pub quotes: Vec<QuoteRecord>,
    pub timestamp: String,
    pub cached: usize,
    pub fresh: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<FetchFailure>>,
}

impl QuotesResponse {
    pub fn from_batch(result: BatchResult, at: DateTime<Utc>, include_failures: bool) -> Self {
        Self {
            success: true,
            quotes: result.quotes,
            timestamp: format_timestamp(at),
            cached: result.cached,
            fresh: result.fresh,
            failures: include_failures.then_some(result.failures),
        }
    }
}

/// Batch-level failure response
#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub timestamp: String,
}

impl FailureResponse {
    pub fn new(error: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            error: error.into(),
            timestamp: format_timestamp(at),
        }
    }
}

/// Health check body
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
}
