//! Storage Tiers Module
//!
//! Two structurally different back-ends behind one `KeyValueStore` trait:
//! - `PersistentStore`: SQLite database, one table per registered store
//! - `FallbackStore`: flat namespaced key space with a byte capacity

mod fallback;
mod persistent;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::{CacheEntry, StoreDescriptor};
use crate::error::TierError;

pub use fallback::FallbackStore;
pub use persistent::PersistentStore;

// == Tier ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Persistent,
    Fallback,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Persistent => write!(f, "persistent"),
            Tier::Fallback => write!(f, "fallback"),
        }
    }
}

/// Key-value capability shared by both tiers.
///
/// Tiers never apply TTL on `get`; the orchestrator owns that decision.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn tier(&self) -> Tier;

    /// Returns the raw entry, expired or not.
    async fn get(&self, store: &StoreDescriptor, key: &str) -> Result<Option<CacheEntry>, TierError>;

    /// Upserts by key.
    async fn put(&self, store: &StoreDescriptor, entry: &CacheEntry) -> Result<(), TierError>;

    /// Removes one entry. Failures are logged, never returned.
    async fn delete(&self, store: &StoreDescriptor, key: &str);

    /// Removes one entry only if it is still expired at `now_ms`, so a
    /// concurrent rewrite of the key survives.
    async fn delete_expired(&self, store: &StoreDescriptor, key: &str, now_ms: u64);

    /// Removes every entry of one store.
    async fn clear(&self, store: &StoreDescriptor);

    /// Removes everything this tier holds for the cache.
    async fn purge(&self, stores: &[StoreDescriptor]) {
        for store in stores {
            self.clear(store).await;
        }
    }

    /// Lists `(key, size_bytes)` for one store.
    async fn enumerate_sizes(&self, store: &StoreDescriptor) -> Result<Vec<(String, u64)>, TierError>;

    /// Lists `(key, size_bytes)` of entries held for stores outside `known`,
    /// grouped by store name. Only tiers that accept unregistered stores
    /// report anything.
    async fn unregistered_sizes(&self, _known: &[StoreDescriptor]) -> Vec<(String, Vec<(String, u64)>)> {
        Vec::new()
    }

    /// Proactively drops expired entries, returning how many went away.
    /// Tiers that are only swept lazily keep the default.
    async fn sweep(&self) -> usize {
        0
    }
}

/// Shared tier handle.
pub type SharedStore = Arc<dyn KeyValueStore>;
