//! Persistent string key-value storage backends.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::StoreError;

/// Origin-scoped string storage. Each call is one atomic read or write.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Read the value under `key`.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Every stored key.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Arc<S> {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove_item(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys().await
    }
}

/// In-memory storage with an optional byte quota.
///
/// Usage is the sum of key and value lengths. A disabled storage fails
/// every call with `StoreError::Unavailable`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
    quota: Option<u64>,
    disabled: AtomicBool,
}

impl MemoryStorage {
    /// Unbounded storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes pushing usage past `bytes`.
    pub fn with_quota(bytes: u64) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Enable or disable the storage.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    /// Bytes currently used.
    pub async fn usage(&self) -> u64 {
        usage(&*self.items.read().await)
    }

    fn check_enabled(&self) -> Result<(), StoreError> {
        if self.disabled.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("storage is disabled".into()))
        } else {
            Ok(())
        }
    }
}

fn usage(items: &BTreeMap<String, String>) -> u64 {
    items
        .iter()
        .map(|(k, v)| (k.len() + v.len()) as u64)
        .sum()
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_enabled()?;
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_enabled()?;
        let mut items = self.items.write().await;
        if let Some(quota) = self.quota {
            let current = usage(&*items);
            let replaced = items.get(key).map(|v| (key.len() + v.len()) as u64).unwrap_or(0);
            let needed = current - replaced + (key.len() + value.len()) as u64;
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.check_enabled()?;
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.check_enabled()?;
        Ok(self.items.read().await.keys().cloned().collect())
    }
}
