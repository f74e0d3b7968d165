//! How a routed request was answered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source of the response handed back for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from a cache partition without touching the network.
    Hit,
    /// Not cached; fetched from the network.
    Miss,
    /// Network-first: the network answered.
    Network,
    /// Network failed; served a previously cached copy.
    Fallback,
    /// Network failed and nothing was cached; synthesized response.
    Offline,
    /// Not intercepted.
    Bypass,
}

impl CacheStatus {
    /// Whether the response came out of a cache partition.
    pub fn from_cache(&self) -> bool {
        matches!(self, Self::Hit | Self::Fallback)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Network => write!(f, "NETWORK"),
            Self::Fallback => write!(f, "FALLBACK"),
            Self::Offline => write!(f, "OFFLINE"),
            Self::Bypass => write!(f, "BYPASS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cache() {
        assert!(CacheStatus::Hit.from_cache());
        assert!(CacheStatus::Fallback.from_cache());
        assert!(!CacheStatus::Network.from_cache());
        assert!(!CacheStatus::Offline.from_cache());
    }

    #[test]
    fn test_display() {
        assert_eq!(CacheStatus::Fallback.to_string(), "FALLBACK");
        assert_eq!(serde_json::to_string(&CacheStatus::Miss).unwrap(), r#""miss""#);
    }
}
