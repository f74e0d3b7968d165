//! Page-side cache management.

use std::sync::Arc;

use offline_cache::{add_all, CacheResult, CacheStorage, ControlMessage, WorkerController};
use offline_core::{Clock, PageConfig, Request, SystemClock};
use offline_fetch::Fetcher;
use offline_store::{CleanupReport, ExpiryStore, KeyValueStorage};
use serde::Serialize;
use url::Url;

use crate::{CacheSize, StorageEstimator};

/// What `clear_all` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    /// Whether `CLEAR_CACHE` reached a controlling worker.
    pub worker_cleared: bool,
    /// Result of the store cleanup pass.
    pub store: CleanupReport,
}

struct Precache {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    partition: String,
    origin: Url,
}

/// Explicitly constructed page-level cache manager.
///
/// Every collaborator except the store is optional; a missing one turns the
/// matching operation into a no-op.
pub struct CacheManager<K, C = SystemClock> {
    store: ExpiryStore<K, C>,
    controller: Option<Arc<dyn WorkerController>>,
    estimator: Option<Arc<dyn StorageEstimator>>,
    precache: Option<Precache>,
}

impl<K: KeyValueStorage, C: Clock> CacheManager<K, C> {
    pub fn new(store: ExpiryStore<K, C>) -> Self {
        Self {
            store,
            controller: None,
            estimator: None,
            precache: None,
        }
    }

    /// Message port to the worker controlling the page.
    pub fn with_controller(mut self, controller: Arc<dyn WorkerController>) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn StorageEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Cache storage and network used by `precache`; relative URLs resolve against `origin`.
    pub fn with_precache(
        mut self,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        config: &PageConfig,
        origin: Url,
    ) -> Self {
        self.precache = Some(Precache {
            storage,
            fetcher,
            partition: config.precache_partition.clone(),
            origin,
        });
        self
    }

    pub fn store(&self) -> &ExpiryStore<K, C> {
        &self.store
    }

    /// Page-load housekeeping: one cleanup pass over the store, reaping
    /// expired entries of every version token.
    pub async fn start(&self) -> CleanupReport {
        let report = self.store.cleanup().await;
        tracing::debug!(removed = report.removed, "startup store cleanup");
        report
    }

    /// Ask the controlling worker to drop every partition, then reap expired store entries.
    pub async fn clear_all(&self) -> ClearReport {
        let mut worker_cleared = false;
        if let Some(controller) = &self.controller {
            if controller.has_controller().await {
                match controller.post_message(ControlMessage::ClearCache).await {
                    Ok(()) => worker_cleared = true,
                    Err(e) => tracing::warn!(error = %e, "failed to clear worker caches"),
                }
            }
        }

        let store = self.store.cleanup().await;
        tracing::info!(worker_cleared, removed = store.removed, "all caches cleared");
        ClearReport {
            worker_cleared,
            store,
        }
    }

    /// Formatted storage usage, or `None` without an estimator.
    pub async fn size(&self) -> Option<CacheSize> {
        let estimator = self.estimator.as_ref()?;
        estimator.estimate().await.map(CacheSize::from)
    }

    /// Add every URL to the precache partition, all or nothing.
    ///
    /// Returns the number of entries stored; 0 when no cache storage is configured.
    pub async fn precache(&self, urls: &[String]) -> CacheResult<usize> {
        let Some(precache) = &self.precache else {
            tracing::debug!("no cache storage, skipping precache");
            return Ok(0);
        };
        let requests = urls
            .iter()
            .map(|url| Request::resolve(&precache.origin, url))
            .collect::<Result<Vec<_>, _>>()?;

        let count = add_all(
            precache.storage.as_ref(),
            precache.fetcher.as_ref(),
            &precache.partition,
            &requests,
        )
        .await?;
        tracing::info!(partition = %precache.partition, count, "precache finished");
        Ok(count)
    }
}

impl<K, C> std::fmt::Debug for CacheManager<K, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("controller", &self.controller.is_some())
            .field("estimator", &self.estimator.is_some())
            .field("precache", &self.precache.as_ref().map(|p| &p.partition))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheStorageEstimator, StorageEstimate};
    use async_trait::async_trait;
    use offline_cache::{CacheError, MemoryCacheStorage, Registration, ServiceWorker};
    use offline_core::{ManualClock, StoreConfig, WorkerConfig, DEFAULT_STORE_TTL_MS};
    use offline_fetch::MockFetcher;
    use offline_store::MemoryStorage;
    use std::time::Duration;

    const T0: u64 = 1_700_000_000_000;

    fn origin() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn manager() -> (Arc<ManualClock>, CacheManager<Arc<MemoryStorage>, Arc<ManualClock>>) {
        let clock = Arc::new(ManualClock::new(T0));
        let store = ExpiryStore::with_clock(
            StoreConfig::default(),
            Arc::new(MemoryStorage::new()),
            clock.clone(),
        );
        (clock, CacheManager::new(store))
    }

    struct FixedEstimator(StorageEstimate);

    #[async_trait]
    impl StorageEstimator for FixedEstimator {
        async fn estimate(&self) -> Option<StorageEstimate> {
            Some(self.0)
        }
    }

    #[tokio::test]
    async fn test_clear_all_without_controller_cleans_store() {
        let (clock, manager) = manager();
        manager.store().set("old", &1).await;
        clock.advance(Duration::from_millis(DEFAULT_STORE_TTL_MS + 1));
        manager.store().set("new", &2).await;

        let report = manager.clear_all().await;
        assert!(!report.worker_cleared);
        assert_eq!(report.store.removed, 1);
        assert_eq!(manager.store().get::<i32>("new").await, Some(2));
    }

    #[tokio::test]
    async fn test_start_reaps_expired_entries_of_old_versions() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(T0));
        let stale = r#"{"data":"old","timestamp":0}"#;
        storage.set_item("img_cache_v0_hero", stale).await.unwrap();

        let store = ExpiryStore::with_clock(StoreConfig::default(), storage.clone(), clock);
        store.set("fresh", &1).await;
        let manager = CacheManager::new(store);

        let report = manager.start().await;
        assert_eq!(report.removed, 1);
        assert_eq!(report.stale_version, 1);
        assert_eq!(storage.keys().await.unwrap(), vec!["img_cache_v1_fresh"]);
    }

    #[tokio::test]
    async fn test_clear_all_posts_to_controller() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(MockFetcher::new().with_text("https://example.com/", "home"));
        let config = WorkerConfig::new("app", "v1", origin()).with_precache(vec!["/".into()]);
        let registration = Arc::new(Registration::new(fetcher.clone()));
        registration
            .register(ServiceWorker::new(config, storage.clone(), fetcher))
            .await
            .unwrap();
        storage.open("precache-v1").await.unwrap();

        let (_, manager) = manager();
        let manager = manager.with_controller(registration);
        let report = manager.clear_all().await;

        assert!(report.worker_cleared);
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_skips_uncontrolled_page() {
        let fetcher = Arc::new(MockFetcher::new());
        let registration: Arc<Registration<Arc<MemoryCacheStorage>, _>> =
            Arc::new(Registration::new(fetcher));

        let (_, manager) = manager();
        let report = manager.with_controller(registration).clear_all().await;
        assert!(!report.worker_cleared);
    }

    #[tokio::test]
    async fn test_size() {
        let (_, manager) = manager();
        assert_eq!(manager.size().await, None);

        let manager = manager.with_estimator(Arc::new(FixedEstimator(StorageEstimate {
            usage: 2048,
            quota: 8192,
        })));
        let size = manager.size().await.unwrap();
        assert_eq!(size.usage, "2 KB");
        assert_eq!(size.quota, "8 KB");
        assert_eq!(size.percent_used, "25.00%");
    }

    #[tokio::test]
    async fn test_size_from_cache_storage() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let (_, manager) = manager();
        let manager =
            manager.with_estimator(Arc::new(CacheStorageEstimator::new(storage, 1024)));
        assert_eq!(manager.size().await.unwrap().usage, "0 Bytes");
    }

    #[tokio::test]
    async fn test_precache() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_text("https://example.com/pricing.html", "pricing")
                .with_text("https://example.com/img/a.png", "png"),
        );
        let (_, manager) = manager();
        let manager =
            manager.with_precache(storage.clone(), fetcher, &PageConfig::default(), origin());

        let urls = vec!["/pricing.html".to_string(), "/img/a.png".to_string()];
        assert_eq!(manager.precache(&urls).await.unwrap(), 2);
        assert_eq!(storage.entry_count("precache-v1").await.unwrap(), 2);

        let result = manager.precache(&["/missing.html".to_string()]).await;
        assert!(matches!(result, Err(CacheError::BulkAddFailed(_))));
        assert_eq!(storage.entry_count("precache-v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_precache_without_storage_is_noop() {
        let (_, manager) = manager();
        assert_eq!(manager.precache(&["/a".to_string()]).await.unwrap(), 0);
    }
}
