//! HTTP response model.

use serde::{Deserialize, Serialize};

/// Content type used for synthesized fallback responses.
pub const TEXT_PLAIN: &str = "text/plain";

/// An HTTP response, either from the network or from a cache partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// The HTTP status code.
    pub status: u16,
    /// The response headers, in received order.
    pub headers: Vec<(String, String)>,
    /// The response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a plain-text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(
            status,
            vec![("Content-Type".to_string(), TEXT_PLAIN.to_string())],
            body.into().into_bytes(),
        )
    }

    /// Whether the status is exactly 200, the only status that gets cached.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Body decoded as UTF-8, lossy.
    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Approximate stored size in bytes (body plus headers).
    pub fn size_bytes(&self) -> u64 {
        let headers: usize = self.headers.iter().map(|(k, v)| k.len() + v.len()).sum();
        (self.body.len() + headers) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response() {
        let resp = Response::text(503, "Offline");
        assert_eq!(resp.status, 503);
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(resp.text_body(), "Offline");
    }

    #[test]
    fn test_is_ok_is_exactly_200() {
        assert!(Response::text(200, "").is_ok());
        assert!(!Response::text(201, "").is_ok());
        assert!(!Response::text(304, "").is_ok());
    }

    #[test]
    fn test_is_success() {
        assert!(Response::text(200, "").is_success());
        assert!(Response::text(204, "").is_success());
        assert!(!Response::text(404, "").is_success());
    }

    #[test]
    fn test_header_case_insensitive() {
        let resp = Response::new(
            200,
            vec![("content-type".to_string(), "image/png".to_string())],
            vec![1, 2, 3],
        );
        assert_eq!(resp.header("Content-Type"), Some("image/png"));
        assert_eq!(resp.header("X-Missing"), None);
    }

    #[test]
    fn test_size_bytes() {
        let resp = Response::new(200, vec![("a".into(), "bc".into())], vec![0; 10]);
        assert_eq!(resp.size_bytes(), 13);
    }
}
