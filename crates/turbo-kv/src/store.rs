//! The storage provider trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::KvError;

/// Asynchronous string key-value storage.
///
/// Values are opaque strings; callers decide the encoding. Every method takes
/// `&self`, so backends use interior mutability.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the value stored under `key`.
    ///
    /// Returns `None` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), KvError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.get(key).await?.is_some())
    }

    /// List all keys.
    async fn keys(&self) -> Result<Vec<String>, KvError>;
}

#[async_trait]
impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        (**self).delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        (**self).exists(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        (**self).keys().await
    }
}
