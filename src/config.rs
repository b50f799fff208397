//! Configuration Module
//!
//! Handles loading the static, process-start configuration from environment
//! variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::cache::{default_stores, StoreDescriptor};

/// Default global quota reported against (50 MiB)
pub const DEFAULT_GLOBAL_QUOTA_BYTES: u64 = 50 * 1024 * 1024;

/// Default capacity of the fallback tier (5 MiB)
pub const DEFAULT_FALLBACK_CAPACITY_BYTES: u64 = 5 * 1024 * 1024;

/// Default reserved namespace prefix in the fallback tier
pub const DEFAULT_FALLBACK_KEY_PREFIX: &str = "cache_";

/// Default persistent database file
pub const DEFAULT_DB_PATH: &str = "tiered_cache.sqlite3";

// == Persistent Location ==
/// Where the persistent tier keeps its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistentLocation {
    /// No persistent storage on this platform; fallback tier only
    Disabled,
    /// Volatile SQLite database, mostly useful for tests
    InMemory,
    /// SQLite database file
    File(PathBuf),
}

impl PersistentLocation {
    /// Parses the `CACHE_DB_PATH` convention.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "off" | "none" => PersistentLocation::Disabled,
            ":memory:" => PersistentLocation::InMemory,
            path => PersistentLocation::File(PathBuf::from(path)),
        }
    }
}

/// Store definition as written in `CACHE_STORES`.
#[derive(Debug, Clone, Deserialize)]
struct StoreSpec {
    name: String,
    max_age_secs: u64,
    max_entry_size: u64,
}

impl From<StoreSpec> for StoreDescriptor {
    fn from(spec: StoreSpec) -> Self {
        StoreDescriptor::new(
            spec.name,
            Duration::from_secs(spec.max_age_secs),
            spec.max_entry_size,
        )
    }
}

/// Cache manager configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registered stores
    pub stores: Vec<StoreDescriptor>,
    /// Byte budget the usage report is measured against
    pub global_quota_bytes: u64,
    /// Reserved namespace prefix for fallback tier keys
    pub fallback_key_prefix: String,
    /// Capacity of the fallback tier in bytes
    pub fallback_capacity_bytes: u64,
    /// Fallback tier sweep interval in seconds
    pub cleanup_interval: u64,
    /// Persistent tier database location
    pub persistent: PersistentLocation,
    /// Upstream request timeout in seconds
    pub fetch_timeout: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DB_PATH` - Persistent database (default: tiered_cache.sqlite3)
    /// - `CACHE_STORES` - JSON array of `{name, max_age_secs, max_entry_size}`
    /// - `GLOBAL_QUOTA_BYTES` - Reported quota (default: 50 MiB)
    /// - `FALLBACK_KEY_PREFIX` - Fallback namespace prefix (default: cache_)
    /// - `FALLBACK_CAPACITY_BYTES` - Fallback capacity (default: 5 MiB)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 3600)
    /// - `FETCH_TIMEOUT` - Upstream timeout in seconds (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            stores: env::var("CACHE_STORES")
                .ok()
                .and_then(|raw| parse_stores(&raw))
                .unwrap_or(defaults.stores),
            global_quota_bytes: parse_var("GLOBAL_QUOTA_BYTES")
                .unwrap_or(defaults.global_quota_bytes),
            fallback_key_prefix: env::var("FALLBACK_KEY_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.fallback_key_prefix),
            fallback_capacity_bytes: parse_var("FALLBACK_CAPACITY_BYTES")
                .unwrap_or(defaults.fallback_capacity_bytes),
            cleanup_interval: parse_var("CLEANUP_INTERVAL")
                .filter(|v: &u64| *v > 0)
                .unwrap_or(defaults.cleanup_interval),
            persistent: env::var("CACHE_DB_PATH")
                .map(|v| PersistentLocation::parse(&v))
                .unwrap_or(defaults.persistent),
            fetch_timeout: parse_var("FETCH_TIMEOUT")
                .filter(|v: &u64| *v > 0)
                .unwrap_or(defaults.fetch_timeout),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Interval between fallback tier sweeps.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    /// Upstream request timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stores: default_stores(),
            global_quota_bytes: DEFAULT_GLOBAL_QUOTA_BYTES,
            fallback_key_prefix: DEFAULT_FALLBACK_KEY_PREFIX.to_string(),
            fallback_capacity_bytes: DEFAULT_FALLBACK_CAPACITY_BYTES,
            cleanup_interval: 3600,
            persistent: PersistentLocation::File(PathBuf::from(DEFAULT_DB_PATH)),
            fetch_timeout: 30,
            server_port: 3000,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_stores(raw: &str) -> Option<Vec<StoreDescriptor>> {
    match serde_json::from_str::<Vec<StoreSpec>>(raw) {
        Ok(specs) if !specs.is_empty() => Some(specs.into_iter().map(Into::into).collect()),
        Ok(_) => {
            warn!("CACHE_STORES is empty, keeping the default store registry");
            None
        }
        Err(err) => {
            warn!("CACHE_STORES is not valid JSON ({}), keeping the default store registry", err);
            None
        }
    }
}
