//! Timeout configuration for the HTTP client.

use std::time::Duration;

/// Timeouts applied by the underlying HTTP client.
///
/// `None` leaves the client's native behaviour in place. The cache layer never
/// adds a timeout of its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Connection timeout.
    pub connect: Option<Duration>,
    /// Total operation timeout.
    pub total: Option<Duration>,
}

impl TimeoutConfig {
    /// No client-side timeouts.
    pub fn none() -> Self {
        Self::default()
    }

    /// Create from millisecond values as found in configuration files.
    pub fn from_millis(connect_ms: Option<u64>, total_ms: Option<u64>) -> Self {
        Self {
            connect: connect_ms.map(Duration::from_millis),
            total: total_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis() {
        let config = TimeoutConfig::from_millis(Some(250), None);
        assert_eq!(config.connect, Some(Duration::from_millis(250)));
        assert_eq!(config.total, None);
        assert_eq!(TimeoutConfig::none(), TimeoutConfig::default());
    }
}
