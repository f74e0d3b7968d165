//! Named cache partitions holding request -> response entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use offline_core::{RequestKey, Response};
use tokio::sync::RwLock;

use crate::error::{CacheError, CacheResult};

/// Persistent mapping of partition name -> (request key -> last stored response).
///
/// Partitions keep their creation order; `match_any` searches them in that order.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if it does not exist.
    async fn open(&self, name: &str) -> CacheResult<()>;

    /// Whether the partition exists.
    async fn has(&self, name: &str) -> CacheResult<bool>;

    /// Partition names in creation order.
    async fn keys(&self) -> CacheResult<Vec<String>>;

    /// Delete a partition. Returns whether it existed.
    async fn delete(&self, name: &str) -> CacheResult<bool>;

    /// Store a response, overwriting any previous entry for the key.
    async fn put(&self, name: &str, key: &RequestKey, response: &Response) -> CacheResult<()>;

    /// Store several responses in one write: either all land or none do.
    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, Response)>) -> CacheResult<()>;

    /// Look up a key in one partition.
    async fn get(&self, name: &str, key: &RequestKey) -> CacheResult<Option<Response>>;

    /// Look up a key across every partition, first hit in creation order.
    async fn match_any(&self, key: &RequestKey) -> CacheResult<Option<Response>>;

    /// Keys stored in a partition.
    async fn entries(&self, name: &str) -> CacheResult<Vec<RequestKey>>;

    /// Number of entries in a partition.
    async fn entry_count(&self, name: &str) -> CacheResult<usize> {
        Ok(self.entries(name).await?.len())
    }

    /// Approximate bytes held across all partitions.
    async fn usage_bytes(&self) -> CacheResult<u64>;
}

#[async_trait]
impl<S: CacheStorage + ?Sized> CacheStorage for Arc<S> {
    async fn open(&self, name: &str) -> CacheResult<()> {
        (**self).open(name).await
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        (**self).has(name).await
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        (**self).keys().await
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        (**self).delete(name).await
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &Response) -> CacheResult<()> {
        (**self).put(name, key, response).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, Response)>) -> CacheResult<()> {
        (**self).put_all(name, entries).await
    }

    async fn get(&self, name: &str, key: &RequestKey) -> CacheResult<Option<Response>> {
        (**self).get(name, key).await
    }

    async fn match_any(&self, key: &RequestKey) -> CacheResult<Option<Response>> {
        (**self).match_any(key).await
    }

    async fn entries(&self, name: &str) -> CacheResult<Vec<RequestKey>> {
        (**self).entries(name).await
    }

    async fn usage_bytes(&self) -> CacheResult<u64> {
        (**self).usage_bytes().await
    }
}

/// A single partition's entries.
pub(crate) type Partition = BTreeMap<RequestKey, Response>;

/// In-memory cache storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    partitions: RwLock<Vec<(String, Partition)>>,
}

impl MemoryCacheStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<()> {
        let mut partitions = self.partitions.write().await;
        if !partitions.iter().any(|(n, _)| n == name) {
            partitions.push((name.to_string(), Partition::new()));
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.partitions.read().await.iter().any(|(n, _)| n == name))
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self
            .partitions
            .read()
            .await
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|(n, _)| n != name);
        Ok(partitions.len() != before)
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &Response) -> CacheResult<()> {
        let mut partitions = self.partitions.write().await;
        let (_, partition) = partitions
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| CacheError::NoSuchPartition(name.to_string()))?;
        partition.insert(key.clone(), response.clone());
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, Response)>) -> CacheResult<()> {
        let mut partitions = self.partitions.write().await;
        let (_, partition) = partitions
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| CacheError::NoSuchPartition(name.to_string()))?;
        partition.extend(entries);
        Ok(())
    }

    async fn get(&self, name: &str, key: &RequestKey) -> CacheResult<Option<Response>> {
        Ok(self
            .partitions
            .read()
            .await
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, p)| p.get(key).cloned()))
    }

    async fn match_any(&self, key: &RequestKey) -> CacheResult<Option<Response>> {
        Ok(self
            .partitions
            .read()
            .await
            .iter()
            .find_map(|(_, p)| p.get(key).cloned()))
    }

    async fn entries(&self, name: &str) -> CacheResult<Vec<RequestKey>> {
        let partitions = self.partitions.read().await;
        let (_, partition) = partitions
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| CacheError::NoSuchPartition(name.to_string()))?;
        Ok(partition.keys().cloned().collect())
    }

    async fn usage_bytes(&self) -> CacheResult<u64> {
        Ok(self
            .partitions
            .read()
            .await
            .iter()
            .flat_map(|(_, p)| p.iter())
            .map(|(k, r)| k.as_str().len() as u64 + r.size_bytes())
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_core::Request;

    fn key(url: &str) -> RequestKey {
        Request::parse(url).unwrap().key()
    }

    #[tokio::test]
    async fn test_open_is_idempotent_and_ordered() {
        let storage = MemoryCacheStorage::new();
        storage.open("b").await.unwrap();
        storage.open("a").await.unwrap();
        storage.open("b").await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_put_requires_open_partition() {
        let storage = MemoryCacheStorage::new();
        let result = storage
            .put("missing", &key("https://example.com/"), &Response::text(200, "x"))
            .await;
        assert!(matches!(result, Err(CacheError::NoSuchPartition(_))));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = MemoryCacheStorage::new();
        let k = key("https://example.com/");
        storage.open("p").await.unwrap();
        storage.put("p", &k, &Response::text(200, "old")).await.unwrap();
        storage.put("p", &k, &Response::text(200, "new")).await.unwrap();

        let got = storage.get("p", &k).await.unwrap().unwrap();
        assert_eq!(got.text_body(), "new");
        assert_eq!(storage.entry_count("p").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_match_any_searches_in_creation_order() {
        let storage = MemoryCacheStorage::new();
        let k = key("https://example.com/logo.png");
        storage.open("first").await.unwrap();
        storage.open("second").await.unwrap();
        storage.put("second", &k, &Response::text(200, "second")).await.unwrap();
        assert_eq!(storage.match_any(&k).await.unwrap().unwrap().text_body(), "second");

        storage.put("first", &k, &Response::text(200, "first")).await.unwrap();
        assert_eq!(storage.match_any(&k).await.unwrap().unwrap().text_body(), "first");
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = MemoryCacheStorage::new();
        storage.open("p").await.unwrap();
        assert!(storage.delete("p").await.unwrap());
        assert!(!storage.delete("p").await.unwrap());
        assert!(!storage.has("p").await.unwrap());
    }

    #[tokio::test]
    async fn test_usage_bytes() {
        let storage = MemoryCacheStorage::new();
        storage.open("p").await.unwrap();
        assert_eq!(storage.usage_bytes().await.unwrap(), 0);
        storage
            .put("p", &key("https://example.com/"), &Response::text(200, "abc"))
            .await
            .unwrap();
        assert!(storage.usage_bytes().await.unwrap() > 3);
    }
}
