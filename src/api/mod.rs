//! Inbound HTTP surface for the quote pipeline

pub mod handlers;
mod rate_limiter;
mod server;
pub mod types;

pub use rate_limiter::{RateLimiterState, TokenBucket};
pub use server::{build_router, ApiServer};
