//! Fallback Cleanup Scheduler
//!
//! Background task that periodically removes expired fallback tier entries.
//! The persistent tier is not swept here; it expires lazily on read.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Owns the recurring sweep task.
///
/// # Example
/// ```ignore
/// let mut scheduler = CleanupScheduler::new(cache.clone(), Duration::from_secs(3600));
/// scheduler.start();
/// // Later, during shutdown:
/// scheduler.stop();
/// ```
pub struct CleanupScheduler {
    cache: Arc<CacheManager>,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl CleanupScheduler {
    /// # Arguments
    /// * `cache` - Shared cache manager whose fallback tier is swept
    /// * `interval` - Time between sweeps
    pub fn new(cache: Arc<CacheManager>, interval: Duration) -> Self {
        Self {
            cache,
            interval: interval.max(Duration::from_millis(1)),
            handle: None,
        }
    }

    // == Start ==
    /// Spawns the sweep loop. Does nothing if it is already running.
    ///
    /// The first sweep happens one full interval after starting.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let cache = self.cache.clone();
        let interval = self.interval;

        self.handle = Some(tokio::spawn(async move {
            info!("Starting fallback cleanup task with interval of {:?}", interval);

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let removed = cache.sweep_fallback().await;
                if removed > 0 {
                    info!("Fallback cleanup: removed {} expired entries", removed);
                } else {
                    debug!("Fallback cleanup: no expired entries found");
                }
            }
        }));
    }

    // == Stop ==
    /// Aborts the sweep loop. Safe to call when not running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Fallback cleanup task stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, StoreDescriptor, StoreRegistry};
    use crate::tiers::FallbackStore;
    use serde_json::json;

    fn fallback_only(clock: Arc<ManualClock>) -> Arc<CacheManager> {
        let fallback = Arc::new(FallbackStore::new("cache_", 1024 * 1024, clock.clone()));
        let registry = StoreRegistry::new(
            vec![StoreDescriptor::new("api", Duration::from_secs(1), 1024)],
            1024 * 1024,
        )
        .unwrap();
        Arc::new(CacheManager::with_tiers(registry, None, fallback, clock))
    }

    #[tokio::test]
    async fn test_scheduler_removes_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = fallback_only(clock.clone());
        cache.set("api", "expire_soon", json!("value")).await;

        clock.advance(Duration::from_secs(5));

        let mut scheduler = CleanupScheduler::new(cache.clone(), Duration::from_millis(50));
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(300)).await;
        scheduler.stop();

        // storage_info counts raw records, expired or not
        let report = cache.storage_info().await;
        assert_eq!(report.store_count("api"), 0);
    }

    #[tokio::test]
    async fn test_scheduler_preserves_valid_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = fallback_only(clock.clone());
        cache.set("api", "long_lived", json!("value")).await;

        let mut scheduler = CleanupScheduler::new(cache.clone(), Duration::from_millis(50));
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.stop();

        assert_eq!(cache.get("api", "long_lived").await, Some(json!("value")));
    }

    #[tokio::test]
    async fn test_scheduler_start_stop() {
        let clock = Arc::new(ManualClock::new(0));
        let mut scheduler = CleanupScheduler::new(fallback_only(clock), Duration::from_secs(1));

        assert!(!scheduler.is_running());
        scheduler.start();
        scheduler.start();
        assert!(scheduler.is_running());

        scheduler.stop();
        assert!(!scheduler.is_running());
        scheduler.stop();
    }
}
