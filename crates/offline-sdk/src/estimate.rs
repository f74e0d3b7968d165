//! Storage usage estimates.

use async_trait::async_trait;
use offline_cache::CacheStorage;
use serde::Serialize;

use crate::format_bytes;

/// Raw usage and quota in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageEstimate {
    pub usage: u64,
    pub quota: u64,
}

/// Formatted storage size, as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSize {
    pub usage: String,
    pub quota: String,
    /// Usage as a percentage of quota with two decimals, e.g. `"12.50%"`.
    pub percent_used: String,
}

impl From<StorageEstimate> for CacheSize {
    fn from(estimate: StorageEstimate) -> Self {
        let percent = if estimate.quota == 0 {
            0.0
        } else {
            estimate.usage as f64 / estimate.quota as f64 * 100.0
        };
        Self {
            usage: format_bytes(estimate.usage),
            quota: format_bytes(estimate.quota),
            percent_used: format!("{:.2}%", percent),
        }
    }
}

/// Source of storage estimates. `None` when no estimate can be made.
#[async_trait]
pub trait StorageEstimator: Send + Sync {
    async fn estimate(&self) -> Option<StorageEstimate>;
}

/// Estimates usage from a cache storage against a fixed quota.
#[derive(Debug)]
pub struct CacheStorageEstimator<S> {
    storage: S,
    quota: u64,
}

impl<S: CacheStorage> CacheStorageEstimator<S> {
    pub fn new(storage: S, quota: u64) -> Self {
        Self { storage, quota }
    }
}

#[async_trait]
impl<S: CacheStorage> StorageEstimator for CacheStorageEstimator<S> {
    async fn estimate(&self) -> Option<StorageEstimate> {
        match self.storage.usage_bytes().await {
            Ok(usage) => Some(StorageEstimate {
                usage,
                quota: self.quota,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "storage estimate unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_cache::MemoryCacheStorage;
    use offline_core::{Request, Response};

    #[test]
    fn test_cache_size_formatting() {
        let size = CacheSize::from(StorageEstimate {
            usage: 1536,
            quota: 1024 * 1024,
        });
        assert_eq!(size.usage, "1.5 KB");
        assert_eq!(size.quota, "1 MB");
        assert_eq!(size.percent_used, "0.15%");
    }

    #[test]
    fn test_zero_quota() {
        let size = CacheSize::from(StorageEstimate { usage: 10, quota: 0 });
        assert_eq!(size.percent_used, "0.00%");
    }

    #[tokio::test]
    async fn test_cache_storage_estimator() {
        let storage = MemoryCacheStorage::new();
        storage.open("p").await.unwrap();
        storage
            .put(
                "p",
                &Request::parse("https://example.com/").unwrap().key(),
                &Response::text(200, "hello"),
            )
            .await
            .unwrap();

        let estimator = CacheStorageEstimator::new(storage, 1000);
        let estimate = estimator.estimate().await.unwrap();
        assert!(estimate.usage > 5);
        assert_eq!(estimate.quota, 1000);
    }
}
