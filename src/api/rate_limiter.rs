//! Rate limiting middleware for the quote endpoints
//!
//! A single token bucket sized at `api_rate_limit` requests per second guards
//! every route it is layered on. Each admitted request can fan out into many
//! upstream calls, so the health route is left unguarded.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Token bucket rate limiter
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum tokens (requests) allowed per period
    capacity: u32,
    /// Current available tokens
    tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rate_per_second: u32) -> Self {
        let rate = rate_per_second.max(1);
        Self {
            capacity: rate,
            tokens: rate as f64,
            refill_rate: rate as f64,
            last_refill: Instant::now(),
        }
    }

    /// Try to consume a token, returns true if allowed
    pub fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        self.tokens =
            (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until a token will be available
    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

/// Shared limiter state
#[derive(Debug)]
pub struct RateLimiterState {
    bucket: Mutex<TokenBucket>,
}

impl RateLimiterState {
    pub fn new(api_rate: u32) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(api_rate)),
        }
    }

    /// Admit a request, or return how long to wait
    pub fn check(&self) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock();
        if bucket.try_acquire() {
            Ok(())
        } else {
            Err(bucket.time_until_available())
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Err(wait_time) = state.check() {
        tracing::warn!(
            "Rate limit exceeded, path: {}, retry after {}ms",
            request.uri().path(),
            wait_time.as_millis()
        );
        return rate_limit_response(wait_time);
    }

    next.run(request).await
}

fn rate_limit_response(retry_after: Duration) -> Response {
    let retry_seconds = (retry_after.as_secs_f64().ceil() as u64).max(1);

    let body = Json(json!({
        "success": false,
        "error": format!("Rate limit exceeded. Please retry after {} seconds.", retry_seconds),
        "retryAfterMs": retry_after.as_millis() as u64,
    }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_seconds));
    response
}
