//! Key-Value error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when using a key-value store.
#[derive(Error, Debug)]
pub enum KvError {
    /// Failed to open the store.
    #[error("Failed to open store: {0}")]
    OpenError(String),

    /// Failed to serialize or deserialize a value.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Failed to perform store operation.
    ///
    /// For [`KvStore`](crate::KvStore) backends outside this crate (remote
    /// stores, databases) whose failures are not filesystem errors.
    #[error("Store operation failed: {0}")]
    StoreError(String),

    /// Filesystem failure in a file-backed store.
    #[error("I/O error at {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KvError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KvError::Io {
            path: path.into(),
            source,
        }
    }
}
