//! Fallback Tier
//!
//! Synchronous flat key space with a byte capacity, used when the persistent
//! tier is unavailable or rejects a write. Collections are emulated by
//! namespacing keys as `prefix + store + "_" + key`; records are JSON
//! `{payload, expiry}`. Keys outside the prefix belong to other users of the
//! area and are never touched.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{KeyValueStore, Tier};
use crate::cache::{CacheEntry, FallbackEntry, Payload, SharedClock, StoreDescriptor};
use crate::error::TierError;

#[derive(Debug, Default)]
struct FlatArea {
    items: BTreeMap<String, String>,
    /// Sum of key and value lengths
    used_bytes: u64,
}

impl FlatArea {
    fn footprint(key: &str, value: &str) -> u64 {
        (key.len() + value.len()) as u64
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.items.remove(key) {
            Some(value) => {
                self.used_bytes -= Self::footprint(key, &value);
                true
            }
            None => false,
        }
    }
}

// == Fallback Store ==
#[derive(Debug)]
pub struct FallbackStore {
    area: Mutex<FlatArea>,
    prefix: String,
    capacity_bytes: u64,
    clock: SharedClock,
}

impl FallbackStore {
    pub fn new(prefix: impl Into<String>, capacity_bytes: u64, clock: SharedClock) -> Self {
        Self {
            area: Mutex::new(FlatArea::default()),
            prefix: prefix.into(),
            capacity_bytes,
            clock,
        }
    }

    fn area(&self) -> MutexGuard<'_, FlatArea> {
        self.area.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Composite key for `key` in `store`.
    pub fn namespaced_key(&self, store: &str, key: &str) -> String {
        format!("{}{}_{}", self.prefix, store, key)
    }

    fn store_prefix(&self, store: &str) -> String {
        format!("{}{}_", self.prefix, store)
    }

    // == Get ==
    /// Reads and decodes a record. Undecodable records are deleted and
    /// reported as absent.
    pub fn get_entry(&self, namespaced_key: &str) -> Option<FallbackEntry> {
        let mut area = self.area();
        let raw = area.items.get(namespaced_key)?;

        match serde_json::from_str::<FallbackEntry>(raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Dropping corrupt fallback record {}: {}", namespaced_key, err);
                area.remove(namespaced_key);
                None
            }
        }
    }

    // == Set ==
    /// Persists `{payload, expiry = now + max_age}`.
    ///
    /// Fails with `WriteFailed` when the record does not fit in the remaining
    /// capacity; the area is left unchanged in that case.
    pub fn set_entry(&self, namespaced_key: &str, payload: Payload, max_age: Duration) -> Result<(), TierError> {
        let record = FallbackEntry::new(payload, self.clock.now_ms(), max_age);
        let raw = serde_json::to_string(&record).map_err(|err| TierError::WriteFailed(err.to_string()))?;
        self.write_raw(namespaced_key, raw)
    }

    /// Stores a raw value, as any other user of the flat area may.
    pub fn set_raw(&self, key: &str, raw: impl Into<String>) -> Result<(), TierError> {
        self.write_raw(key, raw.into())
    }

    fn write_raw(&self, key: &str, raw: String) -> Result<(), TierError> {
        let mut area = self.area();
        let replaced = area
            .items
            .get(key)
            .map(|old| FlatArea::footprint(key, old))
            .unwrap_or(0);
        let needed = FlatArea::footprint(key, &raw);

        if area.used_bytes - replaced + needed > self.capacity_bytes {
            return Err(TierError::WriteFailed(format!(
                "fallback capacity of {} bytes exceeded",
                self.capacity_bytes
            )));
        }

        area.used_bytes = area.used_bytes - replaced + needed;
        area.items.insert(key.to_string(), raw);
        Ok(())
    }

    pub fn remove_entry(&self, namespaced_key: &str) {
        self.area().remove(namespaced_key);
    }

    // == Cleanup ==
    /// Removes every namespaced record that is expired or undecodable.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let mut area = self.area();

        let doomed: Vec<String> = area
            .items
            .iter()
            .filter(|(key, _)| key.starts_with(&self.prefix))
            .filter(|(_, raw)| match serde_json::from_str::<FallbackEntry>(raw) {
                Ok(entry) => entry.is_expired(now),
                Err(_) => true,
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            area.remove(key);
        }

        doomed.len()
    }

    /// Bytes used by all keys, including foreign ones.
    pub fn used_bytes(&self) -> u64 {
        self.area().used_bytes
    }

    pub fn len(&self) -> usize {
        self.area().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for FallbackStore {
    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    async fn get(&self, store: &StoreDescriptor, key: &str) -> Result<Option<CacheEntry>, TierError> {
        let namespaced = self.namespaced_key(&store.name, key);
        let size = {
            let area = self.area();
            match area.items.get(&namespaced) {
                Some(raw) => raw.len() as u64,
                None => return Ok(None),
            }
        };

        Ok(self
            .get_entry(&namespaced)
            .map(|entry| entry.into_cache_entry(key, store.max_age, size)))
    }

    async fn put(&self, store: &StoreDescriptor, entry: &CacheEntry) -> Result<(), TierError> {
        let namespaced = self.namespaced_key(&store.name, &entry.key);
        self.set_entry(&namespaced, entry.payload.clone(), store.max_age)
    }

    async fn delete(&self, store: &StoreDescriptor, key: &str) {
        self.remove_entry(&self.namespaced_key(&store.name, key));
    }

    async fn delete_expired(&self, store: &StoreDescriptor, key: &str, now_ms: u64) {
        let namespaced = self.namespaced_key(&store.name, key);
        let mut area = self.area();
        let expired = area
            .items
            .get(&namespaced)
            .and_then(|raw| serde_json::from_str::<FallbackEntry>(raw).ok())
            .is_some_and(|entry| entry.is_expired(now_ms));
        if expired {
            area.remove(&namespaced);
        }
    }

    async fn clear(&self, store: &StoreDescriptor) {
        let prefix = self.store_prefix(&store.name);
        let mut area = self.area();
        let keys: Vec<String> = area
            .items
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        for key in &keys {
            area.remove(key);
        }
    }

    /// Drops every key under the reserved prefix, registered store or not.
    async fn purge(&self, _stores: &[StoreDescriptor]) {
        let mut area = self.area();
        let keys: Vec<String> = area
            .items
            .keys()
            .filter(|k| k.starts_with(&self.prefix))
            .cloned()
            .collect();
        for key in &keys {
            area.remove(key);
        }
        debug!("Purged {} fallback records", keys.len());
    }

    async fn enumerate_sizes(&self, store: &StoreDescriptor) -> Result<Vec<(String, u64)>, TierError> {
        let prefix = self.store_prefix(&store.name);
        let area = self.area();

        Ok(area
            .items
            .iter()
            .filter_map(|(k, raw)| {
                k.strip_prefix(&prefix)
                    .map(|key| (key.to_string(), FlatArea::footprint(k, raw)))
            })
            .collect())
    }

    async fn unregistered_sizes(&self, known: &[StoreDescriptor]) -> Vec<(String, Vec<(String, u64)>)> {
        let area = self.area();
        let mut grouped: BTreeMap<String, Vec<(String, u64)>> = BTreeMap::new();

        for (k, raw) in &area.items {
            let Some(rest) = k.strip_prefix(&self.prefix) else {
                continue;
            };
            let (store, key) = rest.split_once('_').unwrap_or((rest, ""));
            if known.iter().any(|s| s.name == store) {
                continue;
            }
            grouped
                .entry(store.to_string())
                .or_default()
                .push((key.to_string(), FlatArea::footprint(k, raw)));
        }

        grouped.into_iter().collect()
    }

    async fn sweep(&self) -> usize {
        self.cleanup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use serde_json::json;
    use std::sync::Arc;

    fn store_with_clock(capacity: u64) -> (FallbackStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (FallbackStore::new("cache_", capacity, clock.clone()), clock)
    }

    fn api() -> StoreDescriptor {
        StoreDescriptor::new("api", Duration::from_secs(60), 1024)
    }

    #[tokio::test]
    async fn test_unregistered_sizes_groups_by_store() {
        let (store, _) = store_with_clock(4096);
        let videos = StoreDescriptor::degraded("videos");
        store
            .put(&api(), &CacheEntry::new("a", json!(1), 0).unwrap())
            .await
            .unwrap();
        store
            .put(&videos, &CacheEntry::new("v_1", json!(2), 0).unwrap())
            .await
            .unwrap();
        store.set_raw("theme", "dark").unwrap();

        let extra = store.unregistered_sizes(&[api()]).await;
        assert_eq!(extra.len(), 1);
        let (name, sizes) = &extra[0];
        assert_eq!(name, "videos");
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].0, "v_1");
        assert!(sizes[0].1 > "cache_videos_v_1".len() as u64);
    }

    #[tokio::test]
    async fn test_delete_expired_checks_expiry() {
        let (store, _) = store_with_clock(4096);
        store
            .put(&api(), &CacheEntry::new("k", json!(1), 0).unwrap())
            .await
            .unwrap();

        store.delete_expired(&api(), "k", 61_000).await;
        assert_eq!(store.len(), 1);

        store.delete_expired(&api(), "k", 61_001).await;
        assert!(store.is_empty());
    }

    #[test]
    fn test_namespaced_key() {
        let (store, _) = store_with_clock(1024);
        assert_eq!(store.namespaced_key("api", "k1"), "cache_api_k1");
    }

    #[test]
    fn test_set_and_get_entry() {
        let (store, _) = store_with_clock(1024);
        store
            .set_entry("cache_api_k", json!({"a": 1}), Duration::from_secs(60))
            .unwrap();

        let entry = store.get_entry("cache_api_k").unwrap();
        assert_eq!(entry.payload, json!({"a": 1}));
        assert_eq!(entry.expiry, 61_000);
    }

    #[test]
    fn test_corrupt_record_is_deleted() {
        let (store, _) = store_with_clock(1024);
        store.set_raw("cache_api_bad", "{oops").unwrap();

        assert!(store.get_entry("cache_api_bad").is_none());
        assert!(store.is_empty());
        assert_eq!(store.used_bytes(), 0);
    }

    #[test]
    fn test_capacity_exceeded() {
        let (store, _) = store_with_clock(64);
        let result = store.set_entry("cache_api_k", json!("x".repeat(100)), Duration::from_secs(1));

        assert!(matches!(result, Err(TierError::WriteFailed(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_overwrite_accounts_for_replaced_value() {
        let (store, _) = store_with_clock(1024);
        store.set_raw("k", "0123456789").unwrap();
        store.set_raw("k", "01").unwrap();
        assert_eq!(store.used_bytes(), 3);
    }

    #[test]
    fn test_cleanup_removes_expired_and_corrupt() {
        let (store, clock) = store_with_clock(4096);
        store
            .set_entry("cache_api_short", json!(1), Duration::from_secs(1))
            .unwrap();
        store
            .set_entry("cache_api_long", json!(2), Duration::from_secs(3600))
            .unwrap();
        store.set_raw("cache_api_garbage", "not json").unwrap();
        store.set_raw("theme", "dark").unwrap();

        clock.advance(Duration::from_secs(2));

        assert_eq!(store.cleanup(), 2);
        assert!(store.get_entry("cache_api_long").is_some());
        assert_eq!(store.len(), 2, "foreign key must survive");
    }

    #[tokio::test]
    async fn test_trait_round_trip() {
        let (store, _) = store_with_clock(4096);
        let entry = CacheEntry::new("k1", json!([1, 2]), 1_000).unwrap();

        store.put(&api(), &entry).await.unwrap();
        let loaded = store.get(&api(), "k1").await.unwrap().unwrap();

        assert_eq!(loaded.payload, json!([1, 2]));
        assert_eq!(loaded.created_at, 1_000);
    }

    #[tokio::test]
    async fn test_clear_and_purge_respect_namespaces() {
        let (store, _) = store_with_clock(4096);
        let images = StoreDescriptor::new("images", Duration::from_secs(60), 1024);
        store
            .put(&api(), &CacheEntry::new("a", json!(1), 0).unwrap())
            .await
            .unwrap();
        store
            .put(&images, &CacheEntry::new("b", json!(2), 0).unwrap())
            .await
            .unwrap();
        store.set_raw("cache_legacy_c", "{}").unwrap();
        store.set_raw("theme", "dark").unwrap();

        store.clear(&api()).await;
        assert!(store.get(&api(), "a").await.unwrap().is_none());
        assert!(store.get(&images, "b").await.unwrap().is_some());

        store.purge(&[]).await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_bytes(), "themedark".len() as u64);
    }

    #[tokio::test]
    async fn test_enumerate_sizes() {
        let (store, _) = store_with_clock(4096);
        store
            .put(&api(), &CacheEntry::new("k", json!(1), 0).unwrap())
            .await
            .unwrap();

        let sizes = store.enumerate_sizes(&api()).await.unwrap();
        let raw_len = r#"{"payload":1,"expiry":61000}"#.len() as u64;
        assert_eq!(sizes, vec![("k".to_string(), "cache_api_k".len() as u64 + raw_len)]);
    }
}
