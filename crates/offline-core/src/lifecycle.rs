//! Worker lifecycle tracking.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle phases of a request-intercepting worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerPhase {
    /// Created, install not yet attempted.
    #[default]
    Parsed,
    /// Pre-population in progress.
    Installing,
    /// Installed and waiting to activate.
    Installed,
    /// Old partitions being swept.
    Activating,
    /// Active and handling fetches.
    Activated,
    /// Install failed or replaced; never used again.
    Redundant,
}

impl WorkerPhase {
    /// Whether `install` may run from this phase.
    pub fn can_install(&self) -> bool {
        matches!(self, Self::Parsed)
    }

    /// Whether `activate` may run from this phase.
    pub fn can_activate(&self) -> bool {
        matches!(self, Self::Installed)
    }

    /// Whether the worker intercepts fetches in this phase.
    pub fn handles_fetches(&self) -> bool {
        matches!(self, Self::Activated)
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert!(WorkerPhase::Parsed.can_install());
        assert!(!WorkerPhase::Installed.can_install());
        assert!(WorkerPhase::Installed.can_activate());
        assert!(!WorkerPhase::Redundant.can_activate());
        assert!(WorkerPhase::Activated.handles_fetches());
        assert!(!WorkerPhase::Activating.handles_fetches());
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&WorkerPhase::Activated).unwrap();
        assert_eq!(json, r#""activated""#);
    }
}
