//! Expiration & Admission Policy
//!
//! Pure functions consulted by the orchestrator. Lazy expiration on read is
//! decided here; the proactive fallback sweep uses `FallbackEntry::is_expired`.

use std::time::Duration;

use crate::cache::clock::duration_ms;
use crate::cache::{CacheEntry, StoreDescriptor};

/// An entry is valid while `now - created_at <= max_age`.
pub fn is_expired(entry: &CacheEntry, max_age: Duration, now_ms: u64) -> bool {
    entry.age_ms(now_ms) > duration_ms(max_age)
}

// == Admission ==
/// Outcome of the size check performed before any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    /// Payload larger than the store allows
    Reject { size: u64, limit: u64 },
}

/// Checks a serialized size against the store's entry cap.
pub fn admit(size_bytes: u64, store: &StoreDescriptor) -> Admission {
    if size_bytes > store.max_entry_size {
        Admission::Reject {
            size: size_bytes,
            limit: store.max_entry_size,
        }
    } else {
        Admission::Admit
    }
}
