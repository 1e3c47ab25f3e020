//! File-backed store: one file per key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use tracing::debug;

use crate::{KvError, KvStore};

/// Extension of committed value files.
const VALUE_EXTENSION: &str = "kv";

/// Extension of in-flight writes.
const TEMP_EXTENSION: &str = "tmp";

/// Key-value store persisted as files in a directory.
///
/// Each key maps to `<base64url(key)>.kv`, so arbitrary keys (including the
/// `@namespace:name` form) become safe file names. Writes go to a temporary
/// file first and are renamed into place, so a reader never observes a
/// partially written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// Temporary files left by writes that never finished are removed.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let store = FileStore::open(".cart").await?;
    /// ```
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, KvError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| KvError::OpenError(format!("{}: {}", dir.display(), e)))?;

        let store = Self { dir };
        let removed = store.remove_stale_temp_files().await?;
        debug!(dir = %store.dir.display(), removed, "opened file store");
        Ok(store)
    }

    /// Directory holding the value files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", URL_SAFE_NO_PAD.encode(key), VALUE_EXTENSION))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(
            ".{}.{:016x}.{}",
            URL_SAFE_NO_PAD.encode(key),
            rand::random::<u64>(),
            TEMP_EXTENSION
        ))
    }

    async fn remove_stale_temp_files(&self) -> Result<usize, KvError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| KvError::io(&self.dir, e))?;

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| KvError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == TEMP_EXTENSION) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(KvError::io(path, e)),
                }
            }
        }
        Ok(removed)
    }
}

/// Recover the key from a value file name, skipping anything else.
fn decode_key(path: &Path) -> Option<String> {
    if path.extension()? != VALUE_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let bytes = URL_SAFE_NO_PAD.decode(stem).ok()?;
    String::from_utf8(bytes).ok()
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::io(path, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        let path = self.path_for(key);
        let temp = self.temp_path_for(key);

        tokio::fs::write(&temp, value.as_bytes())
            .await
            .map_err(|e| KvError::io(&temp, e))?;

        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            // Leave no stray temp file behind; the rename error is what matters.
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(KvError::io(path, e));
        }

        debug!(key, bytes = value.len(), "wrote value file");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KvError::io(path, e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| KvError::io(path, e))
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| KvError::io(&self.dir, e))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| KvError::io(&self.dir, e))?
        {
            if let Some(key) = decode_key(&entry.path()) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}
