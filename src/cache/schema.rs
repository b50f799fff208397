//! Store Schema Registry
//!
//! Static table of named stores, each with a TTL and a maximum admissible
//! entry size, plus the global quota the usage report is measured against.

use std::collections::HashSet;
use std::time::Duration;

use tracing::warn;

use crate::error::{CacheError, Result};

const MIB: u64 = 1024 * 1024;
const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// TTL applied to stores missing from the registry
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(HOUR);

/// Entry cap applied to stores missing from the registry (1 MiB)
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = MIB;

/// Store used by the fetch wrapper for upstream responses
pub const API_STORE: &str = "api";

// == Store Descriptor ==
/// Identifies a named store and its limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDescriptor {
    /// Unique store name
    pub name: String,
    /// Time an entry stays valid after creation
    pub max_age: Duration,
    /// Largest serialized payload admitted, in bytes
    pub max_entry_size: u64,
}

impl StoreDescriptor {
    pub fn new(name: impl Into<String>, max_age: Duration, max_entry_size: u64) -> Self {
        Self {
            name: name.into(),
            max_age,
            max_entry_size,
        }
    }

    /// Descriptor used when a caller names a store the registry does not know.
    pub fn degraded(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_MAX_AGE, DEFAULT_MAX_ENTRY_SIZE)
    }
}

/// The platform's built-in stores.
pub fn default_stores() -> Vec<StoreDescriptor> {
    vec![
        StoreDescriptor::new("textbooks", Duration::from_secs(7 * DAY), 5 * MIB),
        StoreDescriptor::new("chapters", Duration::from_secs(7 * DAY), 2 * MIB),
        StoreDescriptor::new("cases", Duration::from_secs(3 * DAY), MIB),
        StoreDescriptor::new("images", Duration::from_secs(30 * DAY), 10 * MIB),
        StoreDescriptor::new(API_STORE, Duration::from_secs(HOUR), MIB),
    ]
}

/// Store names double as table names and key namespaces, so they are kept
/// to ASCII alphanumerics. `_` separates the store from the key in fallback
/// keys and is not allowed here.
pub fn is_valid_store_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

// == Store Registry ==
/// Immutable lookup table of registered stores.
#[derive(Debug, Clone)]
pub struct StoreRegistry {
    stores: Vec<StoreDescriptor>,
    global_quota_bytes: u64,
}

impl StoreRegistry {
    /// Builds a registry, rejecting invalid or duplicate store names.
    pub fn new(stores: Vec<StoreDescriptor>, global_quota_bytes: u64) -> Result<Self> {
        let mut seen = HashSet::new();
        for store in &stores {
            if !is_valid_store_name(&store.name) {
                return Err(CacheError::Config(format!(
                    "invalid store name '{}'",
                    store.name
                )));
            }
            if !seen.insert(store.name.as_str()) {
                return Err(CacheError::Config(format!(
                    "duplicate store name '{}'",
                    store.name
                )));
            }
        }

        Ok(Self {
            stores,
            global_quota_bytes,
        })
    }

    /// Looks up a registered store.
    pub fn descriptor_for(&self, name: &str) -> Result<&StoreDescriptor> {
        self.stores
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CacheError::UnknownStore(name.to_string()))
    }

    /// Like `descriptor_for`, but degrades to the default limits instead of
    /// failing.
    pub fn resolve(&self, name: &str) -> StoreDescriptor {
        match self.descriptor_for(name) {
            Ok(descriptor) => descriptor.clone(),
            Err(err) => {
                warn!("{}, using default limits", err);
                StoreDescriptor::degraded(name)
            }
        }
    }

    pub fn stores(&self) -> &[StoreDescriptor] {
        &self.stores
    }

    pub fn global_quota_bytes(&self) -> u64 {
        self.global_quota_bytes
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self {
            stores: default_stores(),
            global_quota_bytes: 50 * MIB,
        }
    }
}
