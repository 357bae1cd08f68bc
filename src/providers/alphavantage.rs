//! Alpha Vantage quote provider
//!
//! Uses the GLOBAL_QUOTE endpoint, one request per symbol.
//! Free tier: 5 calls/minute, 500 calls/day. Quota exhaustion is reported in
//! the body (`Note` / `Information`) with a 200 status, not as an HTTP error.

use super::types::QuoteRecord;
use super::{ProviderError, QuoteProvider};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Upper bound on a single upstream call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Alpha Vantage provider implementation
pub struct AlphaVantageProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AlphaVantageProvider {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        "alphavantage"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, symbol: &str) -> std::result::Result<QuoteRecord, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;

        debug!("Fetching {} from Alpha Vantage", symbol);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", api_key),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(ProviderError::UpstreamError(format!("HTTP {}", status)));
        }

        let body = response.text().await.map_err(transport_error)?;
        let quote = parse_global_quote(symbol, &body)?;

        info!(
            "Fetched {}: ${} ({:+}%)",
            quote.symbol, quote.price, quote.change_pct
        );

        Ok(quote)
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::UpstreamError(err.to_string())
    }
}

/// Classify a GLOBAL_QUOTE body and normalize it into a [`QuoteRecord`]
pub fn parse_global_quote(
    symbol: &str,
    body: &str,
) -> std::result::Result<QuoteRecord, ProviderError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let root = value
        .as_object()
        .ok_or_else(|| ProviderError::MalformedResponse("expected a JSON object".to_string()))?;

    if let Some(message) = root.get("Error Message") {
        return Err(ProviderError::UpstreamError(message_text(message)));
    }

    for key in ["Note", "Information"] {
        if let Some(message) = root.get(key) {
            let message = message_text(message);
            warn!("Alpha Vantage rate limit: {}", message);
            return Err(ProviderError::RateLimited(message));
        }
    }

    let global_quote = match root.get("Global Quote") {
        None | Some(Value::Null) => return Err(ProviderError::EmptyResult(symbol.to_string())),
        Some(v) => v,
    };

    let fields = global_quote.as_object().ok_or_else(|| {
        ProviderError::MalformedResponse("\"Global Quote\" is not an object".to_string())
    })?;

    if fields.is_empty() {
        return Err(ProviderError::EmptyResult(symbol.to_string()));
    }

    let raw: GlobalQuote = serde_json::from_value(global_quote.clone())
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    Ok(QuoteRecord {
        symbol: symbol.to_string(),
        price: raw.price,
        change: raw.change,
        change_pct: raw.change_percent,
        volume: raw.volume,
        latest_trading_day: raw.latest_trading_day,
        previous_close: raw.previous_close,
        open: raw.open,
        high: raw.high,
        low: raw.low,
        cached: false,
    }
    .sanitized())
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// GLOBAL_QUOTE payload. Every field tolerates absence and garbage.
#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "02. open", default, deserialize_with = "lenient_f64")]
    open: f64,
    #[serde(rename = "03. high", default, deserialize_with = "lenient_f64")]
    high: f64,
    #[serde(rename = "04. low", default, deserialize_with = "lenient_f64")]
    low: f64,
    #[serde(rename = "05. price", default, deserialize_with = "lenient_f64")]
    price: f64,
    #[serde(rename = "06. volume", default, deserialize_with = "lenient_volume")]
    volume: u64,
    #[serde(rename = "07. latest trading day", default, deserialize_with = "lenient_string")]
    latest_trading_day: String,
    #[serde(rename = "08. previous close", default, deserialize_with = "lenient_f64")]
    previous_close: f64,
    #[serde(rename = "09. change", default, deserialize_with = "lenient_f64")]
    change: f64,
    #[serde(rename = "10. change percent", default, deserialize_with = "lenient_percent")]
    change_percent: f64,
}

/// Accept a number, a numeric string, or anything else
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientValue {
    Float(f64),
    Str(String),
    #[allow(dead_code)]
    Other(Value),
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LenientValue::deserialize(deserializer)? {
        LenientValue::Float(f) => finite_or_zero(f),
        LenientValue::Str(s) => parse_decimal(&s),
        LenientValue::Other(_) => 0.0,
    })
}

fn lenient_percent<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LenientValue::deserialize(deserializer)? {
        LenientValue::Float(f) => finite_or_zero(f),
        LenientValue::Str(s) => parse_percent(&s),
        LenientValue::Other(_) => 0.0,
    })
}

fn lenient_volume<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LenientValue::deserialize(deserializer)? {
        LenientValue::Float(f) => volume_from_f64(f),
        LenientValue::Str(s) => parse_volume(&s),
        LenientValue::Other(_) => 0,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LenientValue::deserialize(deserializer)? {
        LenientValue::Str(s) => s,
        _ => String::new(),
    })
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Parse a decimal string, 0 when it is not a finite number
pub fn parse_decimal(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

/// Parse a percentage such as `"1.2345%"`
pub fn parse_percent(raw: &str) -> f64 {
    let trimmed = raw.trim();
    parse_decimal(trimmed.strip_suffix('%').unwrap_or(trimmed))
}

/// Parse a share count; negative or non-numeric input yields 0
pub fn parse_volume(raw: &str) -> u64 {
    let trimmed = raw.trim();
    trimmed
        .parse::<u64>()
        .unwrap_or_else(|_| volume_from_f64(parse_decimal(trimmed)))
}

fn volume_from_f64(value: f64) -> u64 {
    if value.is_finite() && value >= 0.0 {
        value.trunc() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode as HttpStatus, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    const AAPL_BODY: &str = r#"{
        "Global Quote": {
            "01. symbol": "AAPL",
            "02. open": "189.4900",
            "03. high": "191.2000",
            "04. low": "188.8200",
            "05. price": "190.6400",
            "06. volume": "52312843",
            "07. latest trading day": "2024-05-03",
            "08. previous close": "189.9900",
            "09. change": "0.6500",
            "10. change percent": "0.3421%"
        }
    }"#;

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/query", addr)
    }

    #[test]
    fn test_parse_valid_quote() {
        let quote = parse_global_quote("AAPL", AAPL_BODY).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, 190.64);
        assert_eq!(quote.open, 189.49);
        assert_eq!(quote.high, 191.2);
        assert_eq!(quote.low, 188.82);
        assert_eq!(quote.previous_close, 189.99);
        assert_eq!(quote.change, 0.65);
        assert_eq!(quote.change_pct, 0.3421);
        assert_eq!(quote.volume, 52_312_843);
        assert_eq!(quote.latest_trading_day, "2024-05-03");
        assert!(!quote.cached);
    }

    #[test]
    fn test_symbol_comes_from_request() {
        let quote = parse_global_quote("BRK.B", AAPL_BODY).unwrap();
        assert_eq!(quote.symbol, "BRK.B");
    }

    #[test]
    fn test_malformed_fields_become_zero() {
        let body = r#"{
            "Global Quote": {
                "05. price": "abc",
                "06. volume": "-12",
                "09. change": "NaN",
                "10. change percent": "N/A%",
                "03. high": {"nested": true},
                "04. low": 12.5
            }
        }"#;

        let quote = parse_global_quote("MSFT", body).unwrap();
        assert_eq!(quote.price, 0.0);
        assert_eq!(quote.volume, 0);
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.change_pct, 0.0);
        assert_eq!(quote.high, 0.0);
        assert_eq!(quote.low, 12.5);
        assert_eq!(quote.open, 0.0);
        assert_eq!(quote.latest_trading_day, "");
    }

    #[test]
    fn test_error_message_is_upstream_error() {
        let body = r#"{"Error Message": "Invalid API call."}"#;
        assert_eq!(
            parse_global_quote("XYZ", body),
            Err(ProviderError::UpstreamError("Invalid API call.".to_string()))
        );
    }

    #[test]
    fn test_note_and_information_are_rate_limits() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"}"#;
        assert!(matches!(
            parse_global_quote("AAPL", body),
            Err(ProviderError::RateLimited(_))
        ));

        let body = r#"{"Information": "You have reached the daily rate limit"}"#;
        assert!(matches!(
            parse_global_quote("AAPL", body),
            Err(ProviderError::RateLimited(_))
        ));
    }

    #[test]
    fn test_empty_and_missing_global_quote() {
        assert_eq!(
            parse_global_quote("ZZZZ", r#"{"Global Quote": {}}"#),
            Err(ProviderError::EmptyResult("ZZZZ".to_string()))
        );
        assert_eq!(
            parse_global_quote("ZZZZ", r#"{}"#),
            Err(ProviderError::EmptyResult("ZZZZ".to_string()))
        );
    }

    #[test]
    fn test_unexpected_shapes_are_malformed() {
        assert!(matches!(
            parse_global_quote("AAPL", "<html>gateway</html>"),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_global_quote("AAPL", "[1, 2, 3]"),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_global_quote("AAPL", r#"{"Global Quote": "190.64"}"#),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_percent(" -1.5% "), -1.5);
        assert_eq!(parse_percent("2.0"), 2.0);
        assert_eq!(parse_decimal("inf"), 0.0);
        assert_eq!(parse_volume("1200.7"), 1200);
        assert_eq!(parse_volume(""), 0);
    }

    #[tokio::test]
    async fn test_fetch_without_key_is_not_configured() {
        let provider = AlphaVantageProvider::new(None, "http://127.0.0.1:9/query").unwrap();
        assert!(!provider.is_configured());
        assert_eq!(provider.fetch("AAPL").await, Err(ProviderError::NotConfigured));

        let provider = AlphaVantageProvider::new(Some("  ".to_string()), DEFAULT_BASE_URL).unwrap();
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    async fn test_fetch_sends_query_parameters() {
        let router = Router::new().route(
            "/query",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let ok = params.get("function").map(String::as_str) == Some("GLOBAL_QUOTE")
                    && params.get("symbol").map(String::as_str) == Some("AAPL")
                    && params.get("apikey").map(String::as_str) == Some("test-key");
                if ok {
                    Json(serde_json::from_str::<Value>(AAPL_BODY).unwrap())
                } else {
                    Json(json!({"Error Message": "bad parameters"}))
                }
            }),
        );
        let base_url = spawn_upstream(router).await;

        let provider = AlphaVantageProvider::new(Some("test-key".to_string()), base_url).unwrap();
        let quote = provider.fetch("AAPL").await.unwrap();
        assert_eq!(quote.price, 190.64);
        assert_eq!(quote.symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_fetch_maps_http_429() {
        let router = Router::new().route(
            "/query",
            get(|| async { (HttpStatus::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base_url = spawn_upstream(router).await;

        let provider = AlphaVantageProvider::new(Some("k".to_string()), base_url).unwrap();
        assert!(matches!(
            provider.fetch("AAPL").await,
            Err(ProviderError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_maps_server_error() {
        let router = Router::new().route(
            "/query",
            get(|| async { (HttpStatus::BAD_GATEWAY, "upstream down") }),
        );
        let base_url = spawn_upstream(router).await;

        let provider = AlphaVantageProvider::new(Some("k".to_string()), base_url).unwrap();
        assert!(matches!(
            provider.fetch("AAPL").await,
            Err(ProviderError::UpstreamError(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let router = Router::new().route(
            "/query",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({}))
            }),
        );
        let base_url = spawn_upstream(router).await;

        let provider = AlphaVantageProvider::with_timeout(
            Some("k".to_string()),
            base_url,
            Duration::from_millis(100),
        )
        .unwrap();
        assert_eq!(provider.fetch("AAPL").await, Err(ProviderError::Timeout));
    }
}
