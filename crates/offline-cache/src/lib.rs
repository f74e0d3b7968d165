//! Request-intercepting cache router.
//!
//! This crate provides:
//! - `PartitionNames` - Version-qualified partition names per purpose
//! - `CacheStorage` - Named partitions of request -> response (memory and disk backends)
//! - `classify` - Routes same-origin requests to image, API or static handling
//! - `cache_first` / `network_first` - The two caching strategies
//! - `ServiceWorker` - Install, activate, fetch and message handling for one version
//! - `Registration` - Active/waiting workers and the update flow between versions
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use offline_cache::{MemoryCacheStorage, Registration, ServiceWorker};
//! use offline_core::{Request, WorkerConfig};
//! use offline_fetch::{HttpFetcher, TimeoutConfig};
//!
//! let network = Arc::new(HttpFetcher::new(TimeoutConfig::none())?);
//! let storage = Arc::new(MemoryCacheStorage::new());
//! let worker = ServiceWorker::new(WorkerConfig::default(), storage, network.clone());
//!
//! let registration = Registration::new(network);
//! registration.register(worker).await?;
//! let (response, status) = registration.fetch(&Request::parse("http://localhost:8080/logo.png")?).await?;
//! ```

mod classify;
mod disk;
mod error;
mod message;
mod partition;
mod registration;
mod storage;
mod strategy;
mod worker;

pub use classify::*;
pub use disk::*;
pub use error::*;
pub use message::*;
pub use partition::*;
pub use registration::*;
pub use storage::*;
pub use strategy::*;
pub use worker::*;
