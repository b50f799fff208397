//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is live.
//!
//! # Tasks
//! - Fallback cleanup: removes expired fallback tier entries at a fixed interval

mod cleanup;

pub use cleanup::CleanupScheduler;
