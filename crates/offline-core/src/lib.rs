//! Core abstractions for the offline cache layer.
//!
//! This crate provides the fundamental types shared by the worker-side router
//! and the page-side store:
//! - `Request` / `Response` - The HTTP exchange model
//! - `RequestKey` - Identity of a request inside a cache partition
//! - `Clock` - Injectable time source
//! - `WorkerConfig` / `StoreConfig` / `PageConfig` - Configuration
//! - `WorkerPhase` - Worker lifecycle tracking
//! - `CacheStatus` - How an intercepted request was answered

mod clock;
mod config;
mod error;
mod lifecycle;
mod request;
mod response;
mod status;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use lifecycle::*;
pub use request::*;
pub use response::*;
pub use status::*;
