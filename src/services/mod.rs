//! Services Layer
//!
//! Quote pipeline shared by the REST API and any in-process caller.
//!
//! ```text
//! symbols ──> BatchFetchOrchestrator ──> QuoteFetcher × N ──> QuoteCache
//!                                                       └──> QuoteProvider
//! ```

pub mod quote_fetcher;
pub mod batch_service;

pub use quote_fetcher::{QuoteFetcher, QuoteOutcome};
pub use batch_service::{BatchFetchOrchestrator, BatchResult, FetchFailure};
