//! Public SDK for the offline cache layer.
//!
//! This crate provides the page-side `CacheManager` and re-exports the
//! worker, store and observability crates:
//!
//! ```ignore
//! use offline_sdk::prelude::*;
//!
//! let registration = Arc::new(Registration::new(network.clone()));
//! registration.register(ServiceWorker::new(WorkerConfig::default(), storage, network)).await?;
//!
//! let manager = CacheManager::new(ExpiryStore::new(StoreConfig::default(), MemoryStorage::new()))
//!     .with_controller(registration);
//! manager.clear_all().await;
//! ```

mod estimate;
mod format;
mod manager;

pub use estimate::*;
pub use format::*;
pub use manager::*;

pub use offline_cache;
pub use offline_core;
pub use offline_fetch;
pub use offline_observability;
pub use offline_store;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        format_bytes, CacheManager, CacheSize, CacheStorageEstimator, ClearReport,
        StorageEstimate, StorageEstimator,
    };
    pub use offline_cache::*;
    pub use offline_core::*;
    pub use offline_fetch::*;
    pub use offline_observability::*;
    pub use offline_store::prelude::*;
}
