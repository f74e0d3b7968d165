//! Cache outcome counters.

use std::sync::atomic::{AtomicU64, Ordering};

use offline_core::CacheStatus;
use serde::{Deserialize, Serialize};

/// Counters for routed requests, shared across concurrent fetches.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    network: AtomicU64,
    fallbacks: AtomicU64,
    offline: AtomicU64,
    bypassed: AtomicU64,
    store_failures: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub network: u64,
    pub fallbacks: u64,
    pub offline: u64,
    pub bypassed: u64,
    /// Responses that could not be written to a partition.
    pub store_failures: u64,
}

impl MetricsSnapshot {
    /// Total intercepted requests (bypassed requests excluded).
    pub fn intercepted(&self) -> u64 {
        self.hits + self.misses + self.network + self.fallbacks + self.offline
    }

    /// Fraction of intercepted requests answered from a partition.
    pub fn cache_ratio(&self) -> f64 {
        let total = self.intercepted();
        if total == 0 {
            return 0.0;
        }
        (self.hits + self.fallbacks) as f64 / total as f64
    }
}

impl CacheMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one routed request.
    pub fn record(&self, status: CacheStatus) {
        let counter = match status {
            CacheStatus::Hit => &self.hits,
            CacheStatus::Miss => &self.misses,
            CacheStatus::Network => &self.network,
            CacheStatus::Fallback => &self.fallbacks,
            CacheStatus::Offline => &self.offline,
            CacheStatus::Bypass => &self.bypassed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed partition write.
    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network: self.network.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            offline: self.offline.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}
