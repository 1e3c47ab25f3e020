//! Typed wrapper with automatic serialization.

use serde::{de::DeserializeOwned, Serialize};

use crate::{KvError, KvStore};

/// Type-safe cache over any [`KvStore`].
///
/// Provides automatic JSON serialization for any type that implements
/// `Serialize` and `DeserializeOwned`.
#[derive(Debug, Clone)]
pub struct Cache<S> {
    store: S,
}

impl<S: KvStore> Cache<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let items: Option<Vec<CartItem>> = cache.get("@shop:products").await?;
    /// ```
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, KvError> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Set a value in the cache, replacing whatever was stored before.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// cache.set("@shop:products", &items).await?;
    /// ```
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), KvError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }

    /// Delete a value from the cache.
    pub async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.store.delete(key).await
    }

    /// Check if a key exists in the cache.
    pub async fn exists(&self, key: &str) -> Result<bool, KvError> {
        self.store.exists(key).await
    }

    /// Get all keys in the cache.
    pub async fn keys(&self) -> Result<Vec<String>, KvError> {
        self.store.keys().await
    }
}

/// Helper to build storage keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = storage_key!("@shop", "products");
/// // Returns "@shop:products"
/// ```
#[macro_export]
macro_rules! storage_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = ::std::string::String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}
