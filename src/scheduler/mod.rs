//! Scheduler module
//!
//! Background maintenance tasks:
//! - Expired cache row reaping

mod cache_reaper;

pub use cache_reaper::CacheReaper;
