//! Scripted fetcher for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use offline_core::{Request, Response};

use crate::client::{FetchError, Fetcher};

/// A fetcher that answers from a fixed table of URL -> response.
///
/// Unknown URLs answer 404. Calls are counted whether or not they succeed.
#[derive(Debug, Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<Vec<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    history: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response`.
    pub fn with_route(self, url: impl Into<String>, response: Response) -> Self {
        self.set_route(url, response);
        self
    }

    /// Answer `url` with a 200 text body.
    pub fn with_text(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_route(url, Response::text(200, body))
    }

    /// Make `url` fail at the transport level.
    pub fn with_failure(self, url: impl Into<String>) -> Self {
        lock(&self.failing).push(url.into());
        self
    }

    /// Replace the response for `url`.
    pub fn set_route(&self, url: impl Into<String>, response: Response) {
        lock(&self.routes).insert(url.into(), response);
    }

    /// Simulate losing (or regaining) the network.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Total number of fetches attempted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of fetches attempted for one URL.
    pub fn calls_for(&self, url: &str) -> usize {
        lock(&self.history).iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = request.url.to_string();
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.history).push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Connection("network unreachable".into()));
        }
        if lock(&self.failing).iter().any(|u| *u == url) {
            return Err(FetchError::Connection(format!("connection refused: {}", url)));
        }

        Ok(lock(&self.routes)
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Response::text(404, "Not Found")))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
