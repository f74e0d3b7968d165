//! Disk-backed cache storage.
//!
//! Layout under the root directory:
//! - `index.json` - partition names in creation order
//! - `partitions/<base64 name>.json` - one JSON object per partition

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use offline_core::{RequestKey, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{CacheError, CacheResult};
use crate::storage::{CacheStorage, Partition};

/// On-disk form of a response; the body is base64 so files stay valid JSON text.
#[derive(Debug, Serialize, Deserialize)]
struct StoredResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl From<&Response> for StoredResponse {
    fn from(resp: &Response) -> Self {
        Self {
            status: resp.status,
            headers: resp.headers.clone(),
            body: STANDARD.encode(&resp.body),
        }
    }
}

impl StoredResponse {
    fn into_response(self) -> CacheResult<Response> {
        let body = STANDARD
            .decode(self.body.as_bytes())
            .map_err(|e| CacheError::Storage(format!("corrupt body: {}", e)))?;
        Ok(Response::new(self.status, self.headers, body))
    }
}

/// Cache storage persisted as JSON files under a directory.
///
/// All operations are serialized through one lock; each call is a single
/// read-modify-write.
#[derive(Debug)]
pub struct DiskCacheStorage {
    root: PathBuf,
    lock: Mutex<()>,
}

impl DiskCacheStorage {
    /// Open (creating if needed) storage rooted at `root`.
    pub async fn open_dir(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        let partitions = root.join("partitions");
        tokio::fs::create_dir_all(&partitions)
            .await
            .map_err(|e| CacheError::io(partitions.display().to_string(), e))?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn partition_path(&self, name: &str) -> PathBuf {
        self.root
            .join("partitions")
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(name)))
    }

    async fn read_index(&self) -> CacheResult<Vec<String>> {
        read_json(&self.index_path()).await.map(Option::unwrap_or_default)
    }

    async fn write_index(&self, names: &[String]) -> CacheResult<()> {
        write_json(&self.index_path(), &names).await
    }

    async fn read_partition(&self, name: &str) -> CacheResult<Partition> {
        let stored: Vec<(RequestKey, StoredResponse)> = read_json(&self.partition_path(name))
            .await?
            .unwrap_or_default();
        stored
            .into_iter()
            .map(|(key, resp)| Ok((key, resp.into_response()?)))
            .collect()
    }

    async fn write_partition(&self, name: &str, partition: &Partition) -> CacheResult<()> {
        let stored: Vec<(&RequestKey, StoredResponse)> = partition
            .iter()
            .map(|(key, resp)| (key, StoredResponse::from(resp)))
            .collect();
        write_json(&self.partition_path(name), &stored).await
    }

    async fn require(&self, name: &str) -> CacheResult<()> {
        if self.read_index().await?.iter().any(|n| n == name) {
            Ok(())
        } else {
            Err(CacheError::NoSuchPartition(name.to_string()))
        }
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<()> {
        let _guard = self.lock.lock().await;
        let mut names = self.read_index().await?;
        if names.iter().any(|n| n == name) {
            return Ok(());
        }
        self.write_partition(name, &Partition::new()).await?;
        names.push(name.to_string());
        self.write_index(&names).await
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        let _guard = self.lock.lock().await;
        Ok(self.read_index().await?.iter().any(|n| n == name))
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let _guard = self.lock.lock().await;
        self.read_index().await
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        let _guard = self.lock.lock().await;
        let mut names = self.read_index().await?;
        let before = names.len();
        names.retain(|n| n != name);
        if names.len() == before {
            return Ok(false);
        }
        self.write_index(&names).await?;

        let path = self.partition_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(CacheError::io(path.display().to_string(), e)),
        }
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &Response) -> CacheResult<()> {
        let _guard = self.lock.lock().await;
        self.require(name).await?;
        let mut partition = self.read_partition(name).await?;
        partition.insert(key.clone(), response.clone());
        self.write_partition(name, &partition).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, Response)>) -> CacheResult<()> {
        let _guard = self.lock.lock().await;
        self.require(name).await?;
        let mut partition = self.read_partition(name).await?;
        partition.extend(entries);
        self.write_partition(name, &partition).await
    }

    async fn get(&self, name: &str, key: &RequestKey) -> CacheResult<Option<Response>> {
        let _guard = self.lock.lock().await;
        if !self.read_index().await?.iter().any(|n| n == name) {
            return Ok(None);
        }
        Ok(self.read_partition(name).await?.remove(key))
    }

    async fn match_any(&self, key: &RequestKey) -> CacheResult<Option<Response>> {
        let _guard = self.lock.lock().await;
        for name in self.read_index().await? {
            if let Some(resp) = self.read_partition(&name).await?.remove(key) {
                return Ok(Some(resp));
            }
        }
        Ok(None)
    }

    async fn entries(&self, name: &str) -> CacheResult<Vec<RequestKey>> {
        let _guard = self.lock.lock().await;
        self.require(name).await?;
        Ok(self.read_partition(name).await?.into_keys().collect())
    }

    async fn usage_bytes(&self) -> CacheResult<u64> {
        let _guard = self.lock.lock().await;
        let mut total = 0;
        for name in self.read_index().await? {
            let path = self.partition_path(&name);
            match tokio::fs::metadata(&path).await {
                Ok(meta) => total += meta.len(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(path.display().to_string(), e)),
            }
        }
        Ok(total)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CacheResult<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io(path.display().to_string(), e)),
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> CacheResult<()> {
    let bytes = serde_json::to_vec(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| CacheError::io(tmp.display().to_string(), e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CacheError::io(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_core::Request;

    fn key(url: &str) -> RequestKey {
        Request::parse(url).unwrap().key()
    }

    #[tokio::test]
    async fn test_round_trip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let k = key("https://example.com/logo.png");
        let resp = Response::new(
            200,
            vec![("Content-Type".into(), "image/png".into())],
            vec![0x89, b'P', b'N', b'G', 0, 255],
        );

        {
            let storage = DiskCacheStorage::open_dir(dir.path()).await.unwrap();
            storage.open("app-v1-images").await.unwrap();
            storage.put("app-v1-images", &k, &resp).await.unwrap();
        }

        let storage = DiskCacheStorage::open_dir(dir.path()).await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["app-v1-images"]);
        assert_eq!(storage.match_any(&k).await.unwrap(), Some(resp));
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open_dir(dir.path()).await.unwrap();
        storage.open("app-v1").await.unwrap();
        let path = storage.partition_path("app-v1");
        assert!(path.exists());

        assert!(storage.delete("app-v1").await.unwrap());
        assert!(!path.exists());
        assert!(storage.keys().await.unwrap().is_empty());
        assert!(!storage.delete("app-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_all_and_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open_dir(dir.path()).await.unwrap();
        storage.open("shell").await.unwrap();
        storage
            .put_all(
                "shell",
                vec![
                    (key("https://example.com/"), Response::text(200, "home")),
                    (key("https://example.com/main.js"), Response::text(200, "js")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(storage.entries("shell").await.unwrap().len(), 2);
        assert!(storage.usage_bytes().await.unwrap() > 0);
        assert!(storage.get("other", &key("https://example.com/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_into_missing_partition_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open_dir(dir.path()).await.unwrap();
        let result = storage
            .put("missing", &key("https://example.com/"), &Response::text(200, ""))
            .await;
        assert!(matches!(result, Err(CacheError::NoSuchPartition(_))));
    }
}
