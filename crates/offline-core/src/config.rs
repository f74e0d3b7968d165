//! Worker, store and page configuration.

use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;

/// Seven days, the lifetime of a keyed store entry.
pub const DEFAULT_STORE_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Origin used when the config names none.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080/";

static DEFAULT_ORIGIN_URL: Lazy<Url> = Lazy::new(|| Url::parse(DEFAULT_ORIGIN).unwrap());

/// Configuration of the request-intercepting worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Application namespace used in partition names.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Build version token, bumped by hand on deploy.
    #[serde(default = "default_worker_version")]
    pub version: String,

    /// Origin the worker is installed on. Other origins are never intercepted.
    #[serde(default = "default_origin")]
    pub origin: Url,

    /// Shell URLs pre-populated at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,
}

fn default_app_name() -> String {
    "security-system".to_string()
}

fn default_worker_version() -> String {
    "v1.0.0".to_string()
}

fn default_origin() -> Url {
    DEFAULT_ORIGIN_URL.clone()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/about.html",
        "/features.html",
        "/solutions.html",
        "/technology.html",
        "/contact.html",
        "/main.js",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            version: default_worker_version(),
            origin: default_origin(),
            precache: default_precache(),
        }
    }
}

impl WorkerConfig {
    /// Create a configuration for an app, version and origin with the default manifest.
    pub fn new(app_name: impl Into<String>, version: impl Into<String>, origin: Url) -> Self {
        Self {
            app_name: app_name.into(),
            version: version.into(),
            origin,
            precache: default_precache(),
        }
    }

    /// Replace the precache manifest.
    pub fn with_precache(mut self, urls: Vec<String>) -> Self {
        self.precache = urls;
        self
    }

    /// Reject configurations that would produce ambiguous partition names.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.app_name.is_empty() {
            return Err(CoreError::InvalidConfig("app_name must not be empty".into()));
        }
        if self.version.is_empty() {
            return Err(CoreError::InvalidConfig("version must not be empty".into()));
        }
        if self.origin.cannot_be_a_base() {
            return Err(CoreError::InvalidConfig(format!(
                "origin '{}' is not a base URL",
                self.origin
            )));
        }
        Ok(())
    }
}

/// Configuration of the page-side keyed expiry store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Namespace prefix of every persisted key.
    #[serde(default = "default_store_prefix")]
    pub prefix: String,

    /// Store version token, part of every derived key.
    #[serde(default = "default_store_version")]
    pub version: String,

    /// Entry lifetime in milliseconds.
    #[serde(default = "default_store_ttl_ms")]
    pub ttl_ms: u64,
}

fn default_store_prefix() -> String {
    "img_cache_".to_string()
}

fn default_store_version() -> String {
    "v1".to_string()
}

fn default_store_ttl_ms() -> u64 {
    DEFAULT_STORE_TTL_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prefix: default_store_prefix(),
            version: default_store_version(),
            ttl_ms: default_store_ttl_ms(),
        }
    }
}

impl StoreConfig {
    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Validate the store configuration.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.prefix.is_empty() {
            return Err(CoreError::InvalidConfig("store prefix must not be empty".into()));
        }
        if self.version.contains('_') {
            return Err(CoreError::InvalidConfig(format!(
                "store version '{}' must not contain '_'",
                self.version
            )));
        }
        Ok(())
    }
}

/// Page-side cache management settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Partition used by on-demand precaching from the page.
    #[serde(default = "default_precache_partition")]
    pub precache_partition: String,

    /// Storage quota reported by size estimates, in bytes.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

fn default_precache_partition() -> String {
    "precache-v1".to_string()
}

fn default_quota_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            precache_partition: default_precache_partition(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.app_name, "security-system");
        assert_eq!(config.version, "v1.0.0");
        assert_eq!(config.precache.len(), 8);
        assert!(config.precache.contains(&"/main.js".to_string()));
        assert!(config.validate().is_ok());
        assert_eq!(config.origin.as_str(), DEFAULT_ORIGIN);
    }

    #[test]
    fn test_worker_config_from_partial_toml() {
        let config: WorkerConfig = toml::from_str(
            r#"
            version = "v2.0.0"
            origin = "https://example.com/"
            "#,
        )
        .unwrap();

        assert_eq!(config.app_name, "security-system");
        assert_eq!(config.version, "v2.0.0");
        assert_eq!(config.origin.as_str(), "https://example.com/");
    }

    #[test]
    fn test_worker_validate_rejects_empty_version() {
        let mut config = WorkerConfig::default();
        config.version.clear();
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_store_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.prefix, "img_cache_");
        assert_eq!(config.version, "v1");
        assert_eq!(config.ttl(), Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn test_store_version_with_separator_is_rejected() {
        let config = StoreConfig {
            version: "v_1".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_page_defaults() {
        let config = PageConfig::default();
        assert_eq!(config.precache_partition, "precache-v1");
        assert_eq!(config.quota_bytes, 52_428_800);
    }
}
