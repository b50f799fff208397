//! Tiered Cache - A multi-tier content cache manager
//!
//! Named stores with per-store TTL and size caps, kept in a persistent
//! SQLite tier with an in-memory fallback tier, plus a cache-aside fetch
//! wrapper and a periodic fallback sweep.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod tasks;
pub mod tiers;

pub use api::AppState;
pub use cache::{CacheManager, StorageReport};
pub use config::Config;
pub use fetch::CachedFetcher;
pub use tasks::CleanupScheduler;
