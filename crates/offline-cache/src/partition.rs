//! Partition naming and purposes.

use std::fmt;

use offline_core::WorkerConfig;
use serde::{Deserialize, Serialize};

/// What a partition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    /// Shell documents and scripts, network-first.
    StaticShell,
    /// Images, cache-first.
    Image,
    /// API responses, network-first.
    Api,
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticShell => write!(f, "static-shell"),
            Self::Image => write!(f, "image"),
            Self::Api => write!(f, "api"),
        }
    }
}

/// Version-qualified partition names for one build.
///
/// `<app>-<version>` for the shell, `<app>-<version>-images`,
/// `<app>-<version>-api`. Every name shares the `<app>-` namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    prefix: String,
    static_shell: String,
    images: String,
    api: String,
}

impl PartitionNames {
    /// Build the names for an app and version token.
    pub fn new(app_name: &str, version: &str) -> Self {
        let base = format!("{}-{}", app_name, version);
        Self {
            prefix: format!("{}-", app_name),
            images: format!("{}-images", base),
            api: format!("{}-api", base),
            static_shell: base,
        }
    }

    /// Build the names from worker configuration.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(&config.app_name, &config.version)
    }

    /// Namespace prefix shared by every version of this app.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Current name for a purpose.
    pub fn name(&self, purpose: Purpose) -> &str {
        match purpose {
            Purpose::StaticShell => &self.static_shell,
            Purpose::Image => &self.images,
            Purpose::Api => &self.api,
        }
    }

    /// The three current names.
    pub fn current(&self) -> [&str; 3] {
        [&self.static_shell, &self.images, &self.api]
    }

    /// Whether `name` belongs to this app's namespace.
    pub fn in_namespace(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }

    /// Whether `name` is a namespaced partition from another build.
    pub fn is_stale(&self, name: &str) -> bool {
        self.in_namespace(name) && !self.current().contains(&name)
    }
}
