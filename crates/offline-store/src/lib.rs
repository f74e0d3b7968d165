//! Keyed expiry store for page-side memoization.
//!
//! Values are JSON-serialized as `{"data": .., "timestamp": ..}` under
//! `prefix + version + "_" + key` and expire after a fixed TTL.
//!
//! This crate provides:
//! - `KeyValueStorage` - Persistent string storage seam
//! - `MemoryStorage` / `FileStorage` - In-memory (optional quota) and JSON file backends
//! - `StoreKey` - Derived persisted keys
//! - `ExpiryStore` - `set` / `get` / `remove` / `cleanup` with an injected clock
//!
//! # Example
//!
//! ```rust,ignore
//! use offline_core::StoreConfig;
//! use offline_store::{ExpiryStore, MemoryStorage};
//!
//! let store = ExpiryStore::new(StoreConfig::default(), MemoryStorage::new());
//! store.set("/img/hero.jpg", &meta).await;
//! let meta: Option<ImageMeta> = store.get("/img/hero.jpg").await;
//! store.cleanup().await;
//! ```

mod error;
mod file;
mod key;
mod kv;
mod store;

pub use error::StoreError;
pub use file::FileStorage;
pub use key::StoreKey;
pub use kv::{KeyValueStorage, MemoryStorage};
pub use store::{CleanupReport, ExpiryStore, Record};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{ExpiryStore, FileStorage, KeyValueStorage, MemoryStorage, StoreError};
}
