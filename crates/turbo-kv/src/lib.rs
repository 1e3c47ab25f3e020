//! Async Key-Value persistence layer for TurboCart.
//!
//! Provides a small async storage trait, two backends, and a typed wrapper
//! with automatic JSON serialization.
//!
//! - [`KvStore`] - the provider trait (`get` / `set` / `delete` on string keys)
//! - [`MemoryStore`] - process-local backend for tests and previews
//! - [`FileStore`] - one file per key, survives restarts
//! - [`Cache`] - typed JSON access over any [`KvStore`]
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_kv::{storage_key, Cache, FileStore};
//!
//! let store = FileStore::open(".cart").await?;
//! let cache = Cache::new(store);
//!
//! let key = storage_key!("@shop", "products");
//! cache.set(&key, &items).await?;
//!
//! let items: Option<Vec<Item>> = cache.get(&key).await?;
//! ```

mod error;
mod file;
mod kv;
mod memory;
mod store;

pub use error::KvError;
pub use file::FileStore;
pub use kv::Cache;
pub use memory::MemoryStore;
pub use store::KvStore;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{storage_key, Cache, FileStore, KvError, KvStore, MemoryStore};
}
