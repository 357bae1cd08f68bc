//! Common quote types

use serde::{Deserialize, Serialize};

/// Normalized quote shared by the cache, the fetch pipeline and API callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub symbol: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_pct: f64,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub latest_trading_day: String,
    #[serde(default)]
    pub previous_close: f64,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    /// Set by the fetcher, true when served from cache
    #[serde(default)]
    pub cached: bool,
}

impl QuoteRecord {
    /// Empty quote for a symbol, every numeric field zero
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price: 0.0,
            change: 0.0,
            change_pct: 0.0,
            volume: 0,
            latest_trading_day: String::new(),
            previous_close: 0.0,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            cached: false,
        }
    }

    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    /// Replace any non-finite float with 0
    pub fn sanitized(mut self) -> Self {
        for field in [
            &mut self.price,
            &mut self.change,
            &mut self.change_pct,
            &mut self.previous_close,
            &mut self.open,
            &mut self.high,
            &mut self.low,
        ] {
            if !field.is_finite() {
                *field = 0.0;
            }
        }
        self
    }
}

/// Normalize a requested ticker: trimmed, upper-cased
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let mut quote = QuoteRecord::new("AAPL");
        quote.change_pct = 1.25;
        quote.previous_close = 100.0;
        quote.latest_trading_day = "2024-05-01".to_string();

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["changePct"], 1.25);
        assert_eq!(json["previousClose"], 100.0);
        assert_eq!(json["latestTradingDay"], "2024-05-01");
        assert_eq!(json["cached"], false);
    }

    #[test]
    fn test_sanitized_clears_non_finite() {
        let mut quote = QuoteRecord::new("MSFT");
        quote.price = f64::NAN;
        quote.high = f64::INFINITY;
        quote.low = 3.5;

        let quote = quote.sanitized();
        assert_eq!(quote.price, 0.0);
        assert_eq!(quote.high, 0.0);
        assert_eq!(quote.low, 3.5);
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("  aapl "), "AAPL");
        assert_eq!(normalize_symbol("brk.b"), "BRK.B");
    }
}
