//! Cache router error types.

use offline_core::WorkerPhase;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Failed to serialize/deserialize a stored entry.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error in a disk-backed partition.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The partition does not exist.
    #[error("no such partition: {0}")]
    NoSuchPartition(String),

    /// Only GET requests can be stored.
    #[error("cannot store {method} request {url}")]
    UnsupportedMethod { method: String, url: String },

    /// A bulk add hit a failed or non-2xx fetch; nothing was written.
    #[error("bulk add failed: {0}")]
    BulkAddFailed(String),

    /// Pre-population did not complete; nothing was written.
    #[error("install failed: {0}")]
    InstallFailed(String),

    /// A lifecycle step was invoked out of order.
    #[error("cannot {action} while {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: WorkerPhase,
    },

    /// Invalid request or configuration.
    #[error(transparent)]
    Core(#[from] offline_core::CoreError),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
