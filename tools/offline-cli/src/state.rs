//! Worker lifecycle state persisted between CLI runs.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use offline_core::WorkerPhase;
use serde::{Deserialize, Serialize};

/// One installed worker version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub version: String,
    pub phase: WorkerPhase,
    pub installed_at: DateTime<Utc>,
}

impl WorkerRecord {
    pub fn new(version: impl Into<String>, phase: WorkerPhase) -> Self {
        Self {
            version: version.into(),
            phase,
            installed_at: Utc::now(),
        }
    }
}

/// Active and waiting worker slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerState {
    #[serde(default)]
    pub active: Option<WorkerRecord>,
    #[serde(default)]
    pub waiting: Option<WorkerRecord>,
}

impl WorkerState {
    /// Load state; a missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read worker state: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse worker state: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write worker state: {}", path.display()))
    }

    /// Record a newly activated version; any waiting version is dropped.
    pub fn activate(&mut self, version: &str) {
        let installed_at = match &self.waiting {
            Some(waiting) if waiting.version == version => waiting.installed_at,
            _ => Utc::now(),
        };
        self.active = Some(WorkerRecord {
            version: version.to_string(),
            phase: WorkerPhase::Activated,
            installed_at,
        });
        self.waiting = None;
    }

    /// Record a version installed behind the active one.
    pub fn wait(&mut self, version: &str) {
        self.waiting = Some(WorkerRecord::new(version, WorkerPhase::Installed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = WorkerState::load(&dir.path().join("worker.json")).unwrap();
        assert_eq!(state, WorkerState::default());
    }

    #[test]
    fn test_wait_then_activate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("worker.json");

        let mut state = WorkerState::default();
        state.activate("v1");
        state.wait("v2");
        let installed_at = state.waiting.as_ref().unwrap().installed_at;
        state.save(&path).unwrap();

        let mut state = WorkerState::load(&path).unwrap();
        assert_eq!(state.active.as_ref().unwrap().version, "v1");
        assert_eq!(state.waiting.as_ref().unwrap().phase, WorkerPhase::Installed);

        state.activate("v2");
        let active = state.active.unwrap();
        assert_eq!(active.version, "v2");
        assert_eq!(active.phase, WorkerPhase::Activated);
        assert_eq!(active.installed_at, installed_at);
        assert!(state.waiting.is_none());
    }
}
