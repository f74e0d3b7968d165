//! TTL-bound memoization over key-value storage.

use offline_core::{Clock, StoreConfig, SystemClock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{KeyValueStorage, StoreKey};

/// Persisted shape of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    /// Caller payload.
    pub data: T,
    /// Write time in epoch milliseconds.
    pub timestamp: u64,
}

/// What a read needs from a persisted entry: the age, and the payload if any.
///
/// A missing `data` field reads as `null`. Fractional timestamps are
/// truncated and negative ones count as epoch 0.
#[derive(Debug, Deserialize)]
struct Stamp {
    timestamp: f64,
    #[serde(default)]
    data: serde_json::Value,
}

impl Stamp {
    /// Whether the entry is older than `ttl_ms` at `now`. An entry exactly
    /// `ttl_ms` old is still valid.
    fn is_expired(&self, now: u64, ttl_ms: u64) -> bool {
        now.saturating_sub(self.timestamp as u64) > ttl_ms
    }
}

/// Outcome of a `cleanup` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Namespaced records examined.
    pub scanned: usize,
    /// Expired records deleted.
    pub removed: usize,
    /// Records written under another version token (expired or not).
    pub stale_version: usize,
    /// Records without a usable timestamp; left in place.
    pub corrupt: usize,
    /// Deletions or reads that failed in storage.
    pub failed: usize,
}

/// Namespaced, versioned, TTL-expiring store.
///
/// No method returns an error: storage failures are logged at `warn` and the
/// call degrades to a no-op or an absent value.
#[derive(Debug)]
pub struct ExpiryStore<S, C = SystemClock> {
    config: StoreConfig,
    storage: S,
    clock: C,
}

impl<S: KeyValueStorage> ExpiryStore<S, SystemClock> {
    /// A store on the system clock.
    pub fn new(config: StoreConfig, storage: S) -> Self {
        Self::with_clock(config, storage, SystemClock)
    }
}

impl<S: KeyValueStorage, C: Clock> ExpiryStore<S, C> {
    /// A store with an injected clock.
    pub fn with_clock(config: StoreConfig, storage: S, clock: C) -> Self {
        Self {
            config,
            storage,
            clock,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persisted key for a logical key under the current version.
    pub fn derive_key(&self, key: &str) -> StoreKey {
        StoreKey::new(&self.config.prefix, &self.config.version, key)
    }

    /// Store `payload` stamped with the current time.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, payload: &T) {
        let storage_key = self.derive_key(key).to_string();
        let record = Record {
            data: payload,
            timestamp: self.clock.now_millis(),
        };
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %storage_key, error = %e, "failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.storage.set_item(&storage_key, &json).await {
            tracing::warn!(key = %storage_key, error = %e, "failed to save cache entry");
        }
    }

    /// Read a live payload. Expired records are deleted; corrupt ones read as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = self.derive_key(key).to_string();
        let raw = match self.storage.get_item(&storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %storage_key, error = %e, "failed to read cache entry");
                return None;
            }
        };

        let record: Stamp = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(key = %storage_key, error = %e, "corrupt cache entry");
                return None;
            }
        };

        if record.is_expired(self.clock.now_millis(), self.config.ttl_ms) {
            tracing::debug!(key = %storage_key, "cache entry expired");
            self.remove(key).await;
            return None;
        }

        match serde_json::from_value(record.data) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(key = %storage_key, error = %e, "cache entry has unexpected shape");
                None
            }
        }
    }

    /// Delete an entry if present.
    pub async fn remove(&self, key: &str) {
        let storage_key = self.derive_key(key).to_string();
        if let Err(e) = self.storage.remove_item(&storage_key).await {
            tracing::warn!(key = %storage_key, error = %e, "failed to remove cache entry");
        }
    }

    /// Delete every expired record under the prefix, whatever its version token.
    pub async fn cleanup(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        let keys = match self.storage.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "cache cleanup failed");
                report.failed += 1;
                return report;
            }
        };

        let now = self.clock.now_millis();
        for raw_key in keys.iter().filter(|k| k.starts_with(&self.config.prefix)) {
            report.scanned += 1;
            let other_version = StoreKey::parse(&self.config.prefix, raw_key)
                .map(|k| k.version() != self.config.version)
                .unwrap_or(true);
            if other_version {
                report.stale_version += 1;
            }

            let raw = match self.storage.get_item(raw_key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(key = %raw_key, error = %e, "failed to read cache entry");
                    report.failed += 1;
                    continue;
                }
            };
            let record: Stamp = match serde_json::from_str(&raw) {
                Ok(record) => record,
                Err(_) => {
                    report.corrupt += 1;
                    continue;
                }
            };
            if !record.is_expired(now, self.config.ttl_ms) {
                continue;
            }
            match self.storage.remove_item(raw_key).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::warn!(key = %raw_key, error = %e, "failed to remove cache entry");
                    report.failed += 1;
                }
            }
        }

        if report.corrupt > 0 {
            tracing::warn!(corrupt = report.corrupt, "skipped corrupt cache entries");
        }
        tracing::info!(
            scanned = report.scanned,
            removed = report.removed,
            stale_version = report.stale_version,
            "cache cleanup finished"
        );
        report
    }

    /// Logical keys stored under the current version.
    pub async fn keys(&self) -> Vec<String> {
        match self.storage.keys().await {
            Ok(keys) => keys
                .iter()
                .filter_map(|k| StoreKey::parse(&self.config.prefix, k))
                .filter(|k| k.version() == self.config.version)
                .map(|k| k.key().to_string())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list cache entries");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use offline_core::{ManualClock, DEFAULT_STORE_TTL_MS};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const T0: u64 = 1_700_000_000_000;

    fn store() -> (
        Arc<MemoryStorage>,
        Arc<ManualClock>,
        ExpiryStore<Arc<MemoryStorage>, Arc<ManualClock>>,
    ) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(T0));
        let store = ExpiryStore::with_clock(StoreConfig::default(), storage.clone(), clock.clone());
        (storage, clock, store)
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct ImageMeta {
        width: u32,
        height: u32,
        alt: String,
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (_, _, store) = store();
        let meta = ImageMeta {
            width: 640,
            height: 480,
            alt: "hero".into(),
        };
        store.set("/img/hero.jpg", &meta).await;
        assert_eq!(store.get::<ImageMeta>("/img/hero.jpg").await, Some(meta));
        assert_eq!(store.get::<ImageMeta>("/img/other.jpg").await, None);
    }

    #[tokio::test]
    async fn test_persisted_shape() {
        let (storage, _, store) = store();
        store.set("a", &json!({"x": [1, 2]})).await;

        let raw = storage.get_item("img_cache_v1_a").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"data": {"x": [1, 2]}, "timestamp": T0}));
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let (storage, clock, store) = store();
        store.set("a", &1).await;

        clock.set(T0 + DEFAULT_STORE_TTL_MS);
        assert_eq!(store.get::<i32>("a").await, Some(1));

        clock.advance(Duration::from_millis(1));
        assert_eq!(store.get::<i32>("a").await, None);
        assert_eq!(storage.get_item("img_cache_v1_a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_absent_and_kept() {
        let (storage, _, store) = store();
        storage.set_item("img_cache_v1_bad", "{oops").await.unwrap();

        assert_eq!(store.get::<serde_json::Value>("bad").await, None);
        assert!(storage.get_item("img_cache_v1_bad").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_set_swallows_quota_failure() {
        let storage = Arc::new(MemoryStorage::with_quota(16));
        let store = ExpiryStore::with_clock(
            StoreConfig::default(),
            storage.clone(),
            ManualClock::new(T0),
        );

        store.set("big", &"x".repeat(100)).await;
        assert!(storage.keys().await.unwrap().is_empty());
        assert_eq!(store.get::<String>("big").await, None);
    }

    #[tokio::test]
    async fn test_disabled_storage_is_silent() {
        let (storage, _, store) = store();
        storage.set_disabled(true);

        store.set("a", &1).await;
        assert_eq!(store.get::<i32>("a").await, None);
        store.remove("a").await;
        assert_eq!(store.cleanup().await.failed, 1);
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let (_, _, store) = store();
        store.set("a", &1).await;
        store.remove("a").await;
        store.remove("a").await;
        assert_eq!(store.get::<i32>("a").await, None);
    }

    #[tokio::test]
    async fn test_cleanup_reaps_expired_of_every_version() {
        let (storage, clock, store) = store();
        let old = serde_json::to_string(&Record { data: 1, timestamp: T0 }).unwrap();
        storage.set_item("img_cache_v0_legacy", &old).await.unwrap();
        storage.set_item("img_cache_v1_corrupt", "not json").await.unwrap();
        storage.set_item("theme", "dark").await.unwrap();
        store.set("expired", &1).await;

        clock.advance(Duration::from_millis(DEFAULT_STORE_TTL_MS + 1));
        store.set("fresh", &2).await;

        let report = store.cleanup().await;
        assert_eq!(report.scanned, 4);
        assert_eq!(report.removed, 2);
        assert_eq!(report.stale_version, 1);
        assert_eq!(report.corrupt, 1);
        assert_eq!(report.failed, 0);

        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["img_cache_v1_corrupt", "img_cache_v1_fresh", "theme"]
        );
    }

    #[tokio::test]
    async fn test_cleanup_ages_entries_by_timestamp_alone() {
        let (storage, clock, store) = store();
        storage.set_item("img_cache_v1_a", r#"{"timestamp":0}"#).await.unwrap();
        storage
            .set_item("img_cache_v1_b", r#"{"data":"x","timestamp":1.5}"#)
            .await
            .unwrap();
        storage
            .set_item("img_cache_v1_c", r#"{"data":"x","timestamp":"yesterday"}"#)
            .await
            .unwrap();

        clock.set(3 * DEFAULT_STORE_TTL_MS);
        let report = store.cleanup().await;
        assert_eq!(report.scanned, 3);
        assert_eq!(report.removed, 2);
        assert_eq!(report.corrupt, 1);
        assert_eq!(storage.keys().await.unwrap(), vec!["img_cache_v1_c"]);
    }

    #[tokio::test]
    async fn test_get_entry_without_data() {
        let (storage, clock, store) = store();
        let raw = format!(r#"{{"timestamp":{}}}"#, T0);
        storage.set_item("img_cache_v1_a", &raw).await.unwrap();

        assert_eq!(store.get::<i32>("a").await, None);
        assert_eq!(store.get::<Option<i32>>("a").await, Some(None));
        assert!(storage.get_item("img_cache_v1_a").await.unwrap().is_some());

        clock.advance(Duration::from_millis(DEFAULT_STORE_TTL_MS + 1));
        assert_eq!(store.get::<Option<i32>>("a").await, None);
        assert_eq!(storage.get_item("img_cache_v1_a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_lists_current_version() {
        let (storage, _, store) = store();
        store.set("a", &1).await;
        store.set("b_c", &2).await;
        storage.set_item("img_cache_v0_old", "{}").await.unwrap();

        assert_eq!(store.keys().await, vec!["a", "b_c"]);
    }
}
