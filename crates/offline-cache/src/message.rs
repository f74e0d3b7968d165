//! Control messages posted from the page to the worker.

use serde::{Deserialize, Serialize};

/// A message from page code, tagged on its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting worker without waiting for pages to close.
    SkipWaiting,
    /// Delete every cache partition.
    ClearCache,
    /// Any other message; ignored.
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Interpret an arbitrary posted value. Anything unrecognised is `Unknown`.
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(Self::Unknown)
    }

    /// Interpret a posted JSON string.
    pub fn from_json(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or(Self::Unknown)
    }
}
