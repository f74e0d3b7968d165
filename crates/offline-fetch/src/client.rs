//! The network fetch seam and its HTTP implementation.

use async_trait::async_trait;
use offline_core::{Request, Response};
use tracing::debug;

use crate::timeout::TimeoutConfig;

/// Transport failures. An HTTP status of any kind is not an error here.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Body error: {0}")]
    Body(String),
}

/// The network primitive.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request. `Err` means the network was unreachable or the
    /// request was rejected before a response arrived.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        (**self).fetch(request).await
    }
}

/// HTTP fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given client timeouts.
    pub fn new(timeouts: TimeoutConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(connect) = timeouts.connect {
            builder = builder.connect_timeout(connect);
        }
        if let Some(total) = timeouts.total {
            builder = builder.timeout(total);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await.map_err(classify_error)?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?
            .to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "network response");
        Ok(Response::new(status, headers, body))
    }
}

fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e.to_string())
    } else if e.is_connect() {
        FetchError::Connection(e.to_string())
    } else {
        FetchError::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_builds_with_timeouts() {
        let timeouts = TimeoutConfig::from_millis(Some(100), Some(1_000));
        assert!(HttpFetcher::new(timeouts).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let fetcher = HttpFetcher::new(TimeoutConfig::from_millis(Some(200), Some(500))).unwrap();
        // Port 9 on the loopback interface is the discard service; nothing listens there.
        let request = Request::parse("http://127.0.0.1:9/").unwrap();
        assert!(fetcher.fetch(&request).await.is_err());
    }
}
