//! Cache-first and network-first strategies.
//!
//! Neither strategy returns an error: transport failures become a cached
//! response or a synthesized one, and storage failures are logged.

use futures::future::try_join_all;
use offline_core::{CacheStatus, Method, Request, Response};
use offline_fetch::Fetcher;
use offline_observability::CacheMetrics;

use crate::error::{CacheError, CacheResult};
use crate::storage::CacheStorage;

/// Status of the response synthesized when cache-first cannot reach the network.
pub const NETWORK_ERROR_STATUS: u16 = 408;
/// Body of the cache-first transport error response.
pub const NETWORK_ERROR_BODY: &str = "Network error";
/// Status of the response synthesized when network-first has nothing cached.
pub const OFFLINE_STATUS: u16 = 503;
/// Body of the network-first unavailable response.
pub const OFFLINE_BODY: &str = "Offline - No cached version available";

/// The 408 response returned by cache-first on transport failure.
pub fn network_error_response() -> Response {
    Response::text(NETWORK_ERROR_STATUS, NETWORK_ERROR_BODY)
}

/// The 503 response returned by network-first with no cached fallback.
pub fn offline_response() -> Response {
    Response::text(OFFLINE_STATUS, OFFLINE_BODY)
}

/// Serve from any partition; on miss fetch and store into `partition`.
pub async fn cache_first<S, F>(
    storage: &S,
    fetcher: &F,
    request: &Request,
    partition: &str,
    metrics: &CacheMetrics,
) -> (Response, CacheStatus)
where
    S: CacheStorage + ?Sized,
    F: Fetcher + ?Sized,
{
    match storage.match_any(&request.key()).await {
        Ok(Some(cached)) => {
            tracing::debug!(url = %request.url, "cache hit");
            return (cached, CacheStatus::Hit);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(url = %request.url, error = %e, "cache lookup failed, treating as miss"),
    }

    match fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_ok() {
                store(storage, partition, request, &response, metrics).await;
            }
            (response, CacheStatus::Miss)
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "network request failed");
            (network_error_response(), CacheStatus::Offline)
        }
    }
}

/// Fetch first and refresh `partition`; on transport failure serve any cached copy.
pub async fn network_first<S, F>(
    storage: &S,
    fetcher: &F,
    request: &Request,
    partition: &str,
    metrics: &CacheMetrics,
) -> (Response, CacheStatus)
where
    S: CacheStorage + ?Sized,
    F: Fetcher + ?Sized,
{
    let error = match fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_ok() {
                store(storage, partition, request, &response, metrics).await;
            }
            return (response, CacheStatus::Network);
        }
        Err(e) => e,
    };
    tracing::warn!(url = %request.url, error = %error, "network request failed, trying cache");

    match storage.match_any(&request.key()).await {
        Ok(Some(cached)) => (cached, CacheStatus::Fallback),
        Ok(None) => (offline_response(), CacheStatus::Offline),
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
            (offline_response(), CacheStatus::Offline)
        }
    }
}

/// Write a response into a partition, creating the partition if needed.
///
/// Only `GET` requests can be stored.
pub async fn put_response<S>(
    storage: &S,
    partition: &str,
    request: &Request,
    response: &Response,
) -> CacheResult<()>
where
    S: CacheStorage + ?Sized,
{
    if request.method != Method::GET {
        return Err(CacheError::UnsupportedMethod {
            method: request.method.to_string(),
            url: request.url.to_string(),
        });
    }
    storage.open(partition).await?;
    storage.put(partition, &request.key(), response).await
}

/// Fetch every request concurrently and store them all, or none.
///
/// Any transport failure or non-2xx status fails the whole batch before
/// anything is written. Returns the number of entries stored.
pub async fn add_all<S, F>(
    storage: &S,
    fetcher: &F,
    partition: &str,
    requests: &[Request],
) -> CacheResult<usize>
where
    S: CacheStorage + ?Sized,
    F: Fetcher + ?Sized,
{
    if let Some(request) = requests.iter().find(|r| r.method != Method::GET) {
        return Err(CacheError::UnsupportedMethod {
            method: request.method.to_string(),
            url: request.url.to_string(),
        });
    }
    storage.open(partition).await?;

    let entries = try_join_all(requests.iter().map(|request| async move {
        let response = fetcher
            .fetch(request)
            .await
            .map_err(|e| CacheError::BulkAddFailed(format!("{}: {}", request.url, e)))?;
        if !response.is_success() {
            return Err(CacheError::BulkAddFailed(format!(
                "{} answered {}",
                request.url, response.status
            )));
        }
        Ok((request.key(), response))
    }))
    .await?;

    let count = entries.len();
    storage.put_all(partition, entries).await?;
    Ok(count)
}

async fn store<S>(
    storage: &S,
    partition: &str,
    request: &Request,
    response: &Response,
    metrics: &CacheMetrics,
) where
    S: CacheStorage + ?Sized,
{
    match put_response(storage, partition, request, response).await {
        Ok(()) => tracing::trace!(url = %request.url, partition, "stored response"),
        Err(e @ CacheError::UnsupportedMethod { .. }) => {
            tracing::debug!(error = %e, "response not stored");
        }
        Err(e) => {
            metrics.record_store_failure();
            tracing::warn!(url = %request.url, partition, error = %e, "failed to store response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCacheStorage;
    use offline_fetch::MockFetcher;

    const IMAGE_URL: &str = "https://example.com/logo.png";
    const PAGE_URL: &str = "https://example.com/about.html";

    fn get(url: &str) -> Request {
        Request::parse(url).unwrap()
    }

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_text(IMAGE_URL, "fresh");
        let metrics = CacheMetrics::new();
        let request = get(IMAGE_URL);
        put_response(&storage, "images", &request, &Response::text(200, "cached"))
            .await
            .unwrap();

        let (resp, status) = cache_first(&storage, &fetcher, &request, "images", &metrics).await;
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(resp.text_body(), "cached");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_hit_from_other_partition() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new();
        let request = get(IMAGE_URL);
        put_response(&storage, "precache-v1", &request, &Response::text(200, "pre"))
            .await
            .unwrap();

        let (resp, status) =
            cache_first(&storage, &fetcher, &request, "images", &CacheMetrics::new()).await;
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(resp.text_body(), "pre");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_stores_ok_response() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_text(IMAGE_URL, "png");
        let request = get(IMAGE_URL);
        let metrics = CacheMetrics::new();

        let (resp, status) = cache_first(&storage, &fetcher, &request, "images", &metrics).await;
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(resp.text_body(), "png");

        let (_, status) = cache_first(&storage, &fetcher, &request, "images", &metrics).await;
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_non_200() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_route(IMAGE_URL, Response::text(204, ""));
        let request = get(IMAGE_URL);

        let (resp, _) =
            cache_first(&storage, &fetcher, &request, "images", &CacheMetrics::new()).await;
        assert_eq!(resp.status, 204);
        assert!(!storage.has("images").await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_first_network_failure_is_408() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new();
        fetcher.set_offline(true);

        let (resp, status) =
            cache_first(&storage, &fetcher, &get(IMAGE_URL), "images", &CacheMetrics::new())
                .await;
        assert_eq!(status, CacheStatus::Offline);
        assert_eq!(resp.status, 408);
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(resp.text_body(), NETWORK_ERROR_BODY);
    }

    #[tokio::test]
    async fn test_network_first_overwrites_cache() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_text(PAGE_URL, "new");
        let request = get(PAGE_URL);
        put_response(&storage, "shell", &request, &Response::text(200, "old"))
            .await
            .unwrap();

        let (resp, status) =
            network_first(&storage, &fetcher, &request, "shell", &CacheMetrics::new()).await;
        assert_eq!(status, CacheStatus::Network);
        assert_eq!(resp.text_body(), "new");

        let stored = storage.get("shell", &request.key()).await.unwrap().unwrap();
        assert_eq!(stored.text_body(), "new");
    }

    #[tokio::test]
    async fn test_network_first_keeps_cache_on_error_status() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_route(PAGE_URL, Response::text(500, "boom"));
        let request = get(PAGE_URL);
        put_response(&storage, "shell", &request, &Response::text(200, "old"))
            .await
            .unwrap();

        let (resp, status) =
            network_first(&storage, &fetcher, &request, "shell", &CacheMetrics::new()).await;
        assert_eq!(status, CacheStatus::Network);
        assert_eq!(resp.status, 500);
        let stored = storage.get("shell", &request.key()).await.unwrap().unwrap();
        assert_eq!(stored.text_body(), "old");
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new();
        let request = get(PAGE_URL);
        put_response(&storage, "shell", &request, &Response::text(200, "cached"))
            .await
            .unwrap();
        fetcher.set_offline(true);

        let (resp, status) =
            network_first(&storage, &fetcher, &request, "shell", &CacheMetrics::new()).await;
        assert_eq!(status, CacheStatus::Fallback);
        assert_eq!(resp.text_body(), "cached");
    }

    #[tokio::test]
    async fn test_network_first_offline_without_cache_is_503() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_failure(PAGE_URL);

        let (resp, status) =
            network_first(&storage, &fetcher, &get(PAGE_URL), "shell", &CacheMetrics::new())
                .await;
        assert_eq!(status, CacheStatus::Offline);
        assert_eq!(resp.status, 503);
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(resp.text_body(), OFFLINE_BODY);
    }

    #[tokio::test]
    async fn test_add_all_stores_everything() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new()
            .with_text(PAGE_URL, "about")
            .with_route(IMAGE_URL, Response::text(201, "png"));
        let requests = vec![get(PAGE_URL), get(IMAGE_URL)];

        assert_eq!(add_all(&storage, &fetcher, "pre", &requests).await.unwrap(), 2);
        assert_eq!(storage.entry_count("pre").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_add_all_is_all_or_nothing() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_text(PAGE_URL, "about");
        // IMAGE_URL is unrouted and answers 404
        let requests = vec![get(PAGE_URL), get(IMAGE_URL)];

        let result = add_all(&storage, &fetcher, "pre", &requests).await;
        assert!(matches!(result, Err(CacheError::BulkAddFailed(_))));
        assert_eq!(storage.entry_count("pre").await.unwrap(), 0);

        fetcher.set_offline(true);
        let result = add_all(&storage, &fetcher, "pre", &[get(PAGE_URL)]).await;
        assert!(matches!(result, Err(CacheError::BulkAddFailed(_))));
    }

    #[tokio::test]
    async fn test_non_get_is_never_stored() {
        let storage = MemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_text("https://example.com/api/login", "ok");
        let request = Request::new(
            Method::POST,
            url::Url::parse("https://example.com/api/login").unwrap(),
        );
        let metrics = CacheMetrics::new();

        let (resp, status) = network_first(&storage, &fetcher, &request, "api", &metrics).await;
        assert_eq!(status, CacheStatus::Network);
        assert_eq!(resp.text_body(), "ok");
        assert!(!storage.has("api").await.unwrap());
        assert_eq!(metrics.snapshot().store_failures, 0);
    }
}
