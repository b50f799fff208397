//! Quota & Usage Reporter
//!
//! Walks both tiers and reports occupied bytes per store, per tier and in
//! total against the global quota. Reporting is read-only: entries that are
//! logically expired but not yet evicted are still counted.

use serde::Serialize;
use tracing::warn;

use crate::cache::CacheManager;
use crate::tiers::Tier;

// == Store Usage ==
/// Occupancy of one store in one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreUsage {
    pub name: String,
    pub tier: Tier,
    pub count: usize,
    pub bytes: u64,
}

// == Storage Report ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageReport {
    pub per_store: Vec<StoreUsage>,
    pub persistent_bytes: u64,
    pub fallback_bytes: u64,
    /// Grand total across both tiers
    pub total_bytes: u64,
    /// Grand total in IEC units, e.g. "1.5 KiB"
    pub total_formatted: String,
    pub quota_bytes: u64,
    /// `total_bytes / quota_bytes` as a percentage with two decimals
    pub quota_usage_percent: String,
}

impl StorageReport {
    /// Assembles totals from per-store rows.
    pub fn from_usage(per_store: Vec<StoreUsage>, quota_bytes: u64) -> Self {
        let tier_total = |tier: Tier| -> u64 {
            per_store
                .iter()
                .filter(|u| u.tier == tier)
                .map(|u| u.bytes)
                .sum()
        };
        let persistent_bytes = tier_total(Tier::Persistent);
        let fallback_bytes = tier_total(Tier::Fallback);
        let total_bytes = persistent_bytes + fallback_bytes;

        Self {
            per_store,
            persistent_bytes,
            fallback_bytes,
            total_bytes,
            total_formatted: format_bytes(total_bytes),
            quota_bytes,
            quota_usage_percent: usage_percent(total_bytes, quota_bytes),
        }
    }

    /// Bytes held for `store` across tiers.
    pub fn store_bytes(&self, store: &str) -> u64 {
        self.per_store
            .iter()
            .filter(|u| u.name == store)
            .map(|u| u.bytes)
            .sum()
    }

    /// Entries held for `store` across tiers.
    pub fn store_count(&self, store: &str) -> usize {
        self.per_store
            .iter()
            .filter(|u| u.name == store)
            .map(|u| u.count)
            .sum()
    }
}

impl CacheManager {
    // == Storage Info ==
    /// Reports raw occupancy of every store in every tier, including
    /// fallback records of stores missing from the registry.
    pub async fn storage_info(&self) -> StorageReport {
        let mut per_store = Vec::new();

        for store in self.registry().stores() {
            for tier in self.tiers() {
                match tier.enumerate_sizes(store).await {
                    Ok(sizes) => per_store.push(StoreUsage {
                        name: store.name.clone(),
                        tier: tier.tier(),
                        count: sizes.len(),
                        bytes: sizes.iter().map(|(_, size)| size).sum(),
                    }),
                    Err(err) => warn!(
                        "Skipping {} in {} tier usage: {}",
                        store.name,
                        tier.tier(),
                        err
                    ),
                }
            }
        }

        for tier in self.tiers() {
            for (name, sizes) in tier.unregistered_sizes(self.registry().stores()).await {
                per_store.push(StoreUsage {
                    name,
                    tier: tier.tier(),
                    count: sizes.len(),
                    bytes: sizes.iter().map(|(_, size)| size).sum(),
                });
            }
        }

        StorageReport::from_usage(per_store, self.registry().global_quota_bytes())
    }
}

fn usage_percent(total: u64, quota: u64) -> String {
    if quota == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", total as f64 / quota as f64 * 100.0)
}

/// Format a byte count into IEC units (KiB, MiB, GiB, TiB) with trimmed precision.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit_index = 0;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        return format!("{bytes} {}", UNITS[unit_index]);
    }

    let mut value_str = if value >= 10.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    };

    if value_str.contains('.') {
        while value_str.ends_with('0') {
            value_str.pop();
        }
        if value_str.ends_with('.') {
            value_str.pop();
        }
    }

    format!("{value_str} {}", UNITS[unit_index])
}
