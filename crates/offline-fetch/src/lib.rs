//! Network fetch primitive for the offline cache layer.
//!
//! This crate provides:
//! - `Fetcher` - The network seam the cache strategies fetch through
//! - `HttpFetcher` - `reqwest`-backed implementation
//! - `TimeoutConfig` - Optional native client timeouts
//! - `MockFetcher` - Scripted fetcher with call counting (`test-util` feature)

mod client;
#[cfg(any(test, feature = "test-util"))]
mod mock;
mod timeout;

pub use client::*;
#[cfg(any(test, feature = "test-util"))]
pub use mock::*;
pub use timeout::*;
