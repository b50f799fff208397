//! Cache Orchestrator
//!
//! Public cache API. Every operation tries the persistent tier first and falls
//! back to the fallback tier, hiding the two-tier structure from callers.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::cache::policy::{self, Admission};
use crate::cache::{CacheEntry, Payload, SharedClock, StoreDescriptor, StoreRegistry, SystemClock};
use crate::config::Config;
use crate::error::{Result, TierError};
use crate::tiers::{FallbackStore, KeyValueStore, PersistentStore, SharedStore};

// == Lookup ==
/// Outcome of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Entry found and within its TTL
    Fresh(Payload),
    /// Entry found past its TTL; its deletion has been scheduled
    Expired(Payload),
    Miss,
}

// == Cache Manager ==
pub struct CacheManager {
    registry: StoreRegistry,
    /// `None` once the persistent tier failed to initialise
    persistent: Option<SharedStore>,
    fallback: SharedStore,
    clock: SharedClock,
    /// In-flight lazy deletions
    evictions: TaskTracker,
}

impl CacheManager {
    // == Init ==
    /// Builds the registry and both tiers from configuration.
    ///
    /// A persistent tier that cannot be opened is logged and left out for
    /// the lifetime of the manager; every operation then uses the fallback
    /// tier alone.
    pub async fn init(config: &Config) -> Result<Self> {
        Self::init_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Same as `init`, reading time from `clock`.
    pub async fn init_with_clock(config: &Config, clock: SharedClock) -> Result<Self> {
        let registry = StoreRegistry::new(config.stores.clone(), config.global_quota_bytes)?;

        let persistent = PersistentStore::new(config.persistent.clone(), registry.stores());
        let persistent: Option<SharedStore> = match persistent.init().await {
            Ok(_) => Some(Arc::new(persistent)),
            Err(err) => {
                warn!("Persistent tier unavailable, using fallback tier only: {}", err);
                None
            }
        };

        let fallback = Arc::new(FallbackStore::new(
            config.fallback_key_prefix.clone(),
            config.fallback_capacity_bytes,
            clock.clone(),
        ));

        info!(
            "Cache manager initialised with {} stores (persistent tier: {})",
            registry.stores().len(),
            if persistent.is_some() { "on" } else { "off" }
        );

        Ok(Self::with_tiers(registry, persistent, fallback, clock))
    }

    /// Assembles a manager from already-built tiers.
    pub fn with_tiers(
        registry: StoreRegistry,
        persistent: Option<SharedStore>,
        fallback: SharedStore,
        clock: SharedClock,
    ) -> Self {
        Self {
            registry,
            persistent,
            fallback,
            clock,
            evictions: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn persistent_available(&self) -> bool {
        self.persistent.is_some()
    }

    /// Tiers in the fixed consultation order.
    pub(crate) fn tiers(&self) -> impl Iterator<Item = &SharedStore> {
        self.persistent.iter().chain(std::iter::once(&self.fallback))
    }

    // == Lookup ==
    /// Reads `key`, checking the persistent tier and then the fallback tier.
    ///
    /// The first tier holding the key decides the outcome: a valid entry is
    /// `Fresh`, an expired one is reported as `Expired` and deleted in the
    /// background.
    pub async fn lookup(&self, store: &str, key: &str) -> Lookup {
        let descriptor = self.registry.resolve(store);
        let now = self.clock.now_ms();

        for tier in self.tiers() {
            match tier.get(&descriptor, key).await {
                Ok(Some(entry)) => {
                    if policy::is_expired(&entry, descriptor.max_age, now) {
                        debug!("Expired {}/{} in {} tier", store, key, tier.tier());
                        self.schedule_eviction(tier.clone(), descriptor, key.to_string(), now);
                        return Lookup::Expired(entry.payload);
                    }
                    debug!("Cache hit {}/{} in {} tier", store, key, tier.tier());
                    return Lookup::Fresh(entry.payload);
                }
                Ok(None) => {}
                Err(TierError::CorruptEntry(reason)) => {
                    warn!("Corrupt entry in {} tier, deleting: {}", tier.tier(), reason);
                    let (tier, descriptor, key) = (tier.clone(), descriptor.clone(), key.to_string());
                    self.evictions.spawn(async move {
                        tier.delete(&descriptor, &key).await;
                    });
                }
                Err(err) => {
                    debug!("{} tier read of {}/{} failed: {}", tier.tier(), store, key, err);
                }
            }
        }

        debug!("Cache miss {}/{}", store, key);
        Lookup::Miss
    }

    // == Get ==
    /// Returns the payload if present and within its TTL.
    pub async fn get(&self, store: &str, key: &str) -> Option<Payload> {
        match self.lookup(store, key).await {
            Lookup::Fresh(payload) => Some(payload),
            Lookup::Expired(_) | Lookup::Miss => None,
        }
    }

    // == Set ==
    /// Stores `payload`, replacing any previous entry under `key`.
    ///
    /// Returns `false` when the payload exceeds the store's entry cap or no
    /// tier accepted the write. Neither case is an error for the caller.
    pub async fn set(&self, store: &str, key: &str, payload: Payload) -> bool {
        let descriptor = self.registry.resolve(store);

        let entry = match CacheEntry::new(key, payload, self.clock.now_ms()) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Cannot serialize payload for {}/{}: {}", store, key, err);
                return false;
            }
        };

        if let Admission::Reject { size, limit } = policy::admit(entry.size_bytes, &descriptor) {
            debug!(
                "Rejected {}/{}: {} bytes exceeds the {} byte limit",
                store, key, size, limit
            );
            return false;
        }

        if let Some(persistent) = &self.persistent {
            match persistent.put(&descriptor, &entry).await {
                Ok(()) => {
                    // A key lives in one tier at a time
                    self.fallback.delete(&descriptor, key).await;
                    return true;
                }
                Err(err) => {
                    warn!(
                        "Persistent write of {}/{} failed, using fallback tier: {}",
                        store, key, err
                    );
                    // Drop the previous row so reads reach the fallback copy
                    persistent.delete(&descriptor, key).await;
                }
            }
        }

        self.set_fallback(&descriptor, &entry).await
    }

    /// Writes to the fallback tier, sweeping it once and retrying once when
    /// the first attempt fails.
    async fn set_fallback(&self, descriptor: &StoreDescriptor, entry: &CacheEntry) -> bool {
        let Err(err) = self.fallback.put(descriptor, entry).await else {
            return true;
        };

        let removed = self.fallback.sweep().await;
        debug!(
            "Fallback write of {}/{} failed ({}), swept {} entries before retrying",
            descriptor.name, entry.key, err, removed
        );

        match self.fallback.put(descriptor, entry).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "Dropping write of {}/{}: {}",
                    descriptor.name, entry.key, err
                );
                false
            }
        }
    }

    // == Remove ==
    /// Deletes `key` from every tier.
    pub async fn remove(&self, store: &str, key: &str) {
        let descriptor = self.registry.resolve(store);
        for tier in self.tiers() {
            tier.delete(&descriptor, key).await;
        }
    }

    // == Clear All ==
    /// Empties every registered store in the persistent tier, then every
    /// namespaced key of the fallback tier.
    pub async fn clear_all(&self) {
        for tier in self.tiers() {
            tier.purge(self.registry.stores()).await;
        }
        info!("Cache cleared");
    }

    // == Sweep ==
    /// One proactive pass over the fallback tier.
    pub async fn sweep_fallback(&self) -> usize {
        self.fallback.sweep().await
    }

    /// Waits until every scheduled lazy deletion has finished.
    pub async fn settle(&self) {
        self.evictions.close();
        self.evictions.wait().await;
        self.evictions.reopen();
    }

    fn schedule_eviction(&self, tier: SharedStore, descriptor: StoreDescriptor, key: String, now_ms: u64) {
        self.evictions.spawn(async move {
            tier.delete_expired(&descriptor, &key, now_ms).await;
        });
    }
}
