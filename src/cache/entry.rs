//! Cache Entry Module
//!
//! Defines the units of storage for both tiers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::clock::duration_ms;

/// Opaque cached value.
pub type Payload = serde_json::Value;

/// Size of a payload once serialized, in bytes.
pub fn payload_size(payload: &Payload) -> serde_json::Result<u64> {
    serde_json::to_vec(payload).map(|bytes| bytes.len() as u64)
}

// == Cache Entry ==
/// A stored value with its creation time and serialized size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Key, unique within a store
    pub key: String,
    /// The stored value
    pub payload: Payload,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Serialized payload size, computed at write time
    pub size_bytes: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with `now_ms`.
    ///
    /// # Arguments
    /// * `key` - The key to store under
    /// * `payload` - The value to store
    /// * `now_ms` - Creation time in Unix milliseconds
    pub fn new(key: impl Into<String>, payload: Payload, now_ms: u64) -> serde_json::Result<Self> {
        let size_bytes = payload_size(&payload)?;
        Ok(Self {
            key: key.into(),
            payload,
            created_at: now_ms,
            size_bytes,
        })
    }

    /// Milliseconds elapsed since creation.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at)
    }
}

// == Fallback Entry ==
/// Flat record kept by the fallback tier, carrying an absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub payload: Payload,
    /// Expiration timestamp (Unix milliseconds)
    pub expiry: u64,
}

impl FallbackEntry {
    /// Creates a record expiring `max_age` after `now_ms`.
    pub fn new(payload: Payload, now_ms: u64, max_age: Duration) -> Self {
        Self {
            payload,
            expiry: now_ms.saturating_add(duration_ms(max_age)),
        }
    }

    /// A record is expired once its expiry lies strictly in the past.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expiry < now_ms
    }

    /// Rebuilds the equivalent `CacheEntry` so the orchestrator can apply one
    /// TTL policy to both tiers.
    pub fn into_cache_entry(self, key: impl Into<String>, max_age: Duration, size_bytes: u64) -> CacheEntry {
        CacheEntry {
            key: key.into(),
            created_at: self.expiry.saturating_sub(duration_ms(max_age)),
            payload: self.payload,
            size_bytes,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("k1", json!({"a": 1}), 1_000).unwrap();

        assert_eq!(entry.key, "k1");
        assert_eq!(entry.created_at, 1_000);
        assert_eq!(entry.size_bytes, r#"{"a":1}"#.len() as u64);
    }

    #[test]
    fn test_entry_age() {
        let entry = CacheEntry::new("k1", json!("v"), 1_000).unwrap();
        assert_eq!(entry.age_ms(4_000), 3_000);
        // Clock skew never yields a negative age
        assert_eq!(entry.age_ms(500), 0);
    }

    #[test]
    fn test_fallback_expiry() {
        let entry = FallbackEntry::new(json!("v"), 1_000, Duration::from_secs(1));
        assert_eq!(entry.expiry, 2_000);

        assert!(!entry.is_expired(1_500));
        assert!(!entry.is_expired(2_000), "expiry instant is still valid");
        assert!(entry.is_expired(2_001));
    }

    #[test]
    fn test_fallback_into_cache_entry() {
        let max_age = Duration::from_secs(60);
        let entry = FallbackEntry::new(json!([1, 2]), 10_000, max_age);
        let converted = entry.into_cache_entry("k", max_age, 5);

        assert_eq!(converted.created_at, 10_000);
        assert_eq!(converted.payload, json!([1, 2]));
        assert_eq!(converted.size_bytes, 5);
    }

    #[test]
    fn test_fallback_record_format() {
        let entry = FallbackEntry::new(json!({"a": 1}), 0, Duration::from_millis(5));
        let raw = serde_json::to_string(&entry).unwrap();
        assert_eq!(raw, r#"{"payload":{"a":1},"expiry":5}"#);
    }
}
