//! Observability for the offline cache layer.
//!
//! This crate provides:
//! - `init_logging` - `tracing` subscriber setup (human or JSON output)
//! - `CacheEvent` - One structured record per routed request
//! - `CacheMetrics` - Hit/miss/fallback counters with a serialisable snapshot

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
