//! Cache Module
//!
//! Store registry, entries, TTL/admission policy, the two-tier orchestrator
//! and the usage reporter.

mod clock;
mod entry;
mod manager;
pub mod policy;
mod report;
mod schema;


// Re-export public types
pub use clock::{current_timestamp_ms, duration_ms, Clock, ManualClock, SharedClock, SystemClock};
pub use entry::{payload_size, CacheEntry, FallbackEntry, Payload};
pub use manager::{CacheManager, Lookup};
pub use report::{format_bytes, StorageReport, StoreUsage};
pub use schema::{
    default_stores, is_valid_store_name, StoreDescriptor, StoreRegistry, API_STORE,
    DEFAULT_MAX_AGE, DEFAULT_MAX_ENTRY_SIZE,
};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
