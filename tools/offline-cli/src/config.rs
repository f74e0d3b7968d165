//! CLI configuration.

use anyhow::{Context, Result};
use offline_core::{PageConfig, StoreConfig, WorkerConfig};
use offline_fetch::TimeoutConfig;
use serde::{Deserialize, Serialize};

/// File names searched for, in order, in each directory.
pub const CONFIG_NAMES: [&str; 3] = ["offline.toml", ".offline.toml", "offline.json"];

/// CLI configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Request-intercepting worker.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Keyed expiry store.
    #[serde(default)]
    pub store: StoreConfig,

    /// Page-side cache management.
    #[serde(default)]
    pub page: PageConfig,

    /// Where cache partitions, store entries and worker state live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub network: NetworkConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.worker.validate().context("Invalid [worker] section")?;
        self.store.validate().context("Invalid [store] section")?;
        if self.storage.dir.trim().is_empty() {
            anyhow::bail!("[storage] dir must not be empty");
        }
        Ok(())
    }
}

/// Storage location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory, relative to the working directory unless absolute.
    #[serde(default = "default_storage_dir")]
    pub dir: String,
}

fn default_storage_dir() -> String {
    ".offline".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

/// Client timeouts. Unset means no timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl NetworkConfig {
    pub fn timeouts(&self) -> TimeoutConfig {
        TimeoutConfig::from_millis(self.connect_timeout_ms, self.timeout_ms)
    }
}

/// Generate a default offline.toml config file.
pub fn generate_default_config(app_name: &str, origin: &str) -> String {
    format!(
        r#"# Offline cache configuration

[worker]
app_name = "{app_name}"
version = "v1.0.0"
origin = "{origin}"
precache = [
    "/",
    "/index.html",
    "/about.html",
    "/features.html",
    "/solutions.html",
    "/technology.html",
    "/contact.html",
    "/main.js",
]

[store]
prefix = "img_cache_"
version = "v1"
ttl_ms = 604800000

[page]
precache_partition = "precache-v1"
quota_bytes = 52428800

[storage]
dir = ".offline"

[network]
# connect_timeout_ms = 5000
# timeout_ms = 30000
"#,
        app_name = app_name,
        origin = origin
    )
}
