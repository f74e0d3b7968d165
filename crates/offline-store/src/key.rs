//! Derived storage keys.

use std::fmt;

/// A persisted key: `prefix + version + "_" + key`.
///
/// Version tokens never contain `_`, so a persisted key parses back
/// unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    prefix: String,
    version: String,
    key: String,
}

impl StoreKey {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            version: version.into(),
            key: key.into(),
        }
    }

    /// Split a persisted key back into its parts. `None` if it is not under `prefix`.
    pub fn parse(prefix: &str, raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(prefix)?;
        let (version, key) = rest.split_once('_')?;
        Some(Self::new(prefix, version, key))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The caller's logical key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}_{}", self.prefix, self.version, self.key)
    }
}
