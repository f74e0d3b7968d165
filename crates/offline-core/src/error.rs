//! Core error types.

use thiserror::Error;

/// Errors raised while building requests or loading configuration.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A URL could not be parsed or resolved.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Configuration is structurally valid but semantically wrong.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
