use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::PersistError;

/// A JSON document on disk, written wholesale. Writers to the same file are
/// serialized through `write_lock`.
#[derive(Debug, Clone)]
pub struct BlobFile {
    path: Option<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl BlobFile {
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Loads the blob. A missing or corrupt file is replaced by `T::default()`
    /// and written back immediately.
    pub async fn load_or_reset<T>(&self) -> T
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let Some(path) = &self.path else {
            return T::default();
        };

        let loaded = match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => return value,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "corrupt JSON blob, reinitializing");
                    T::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no stored data yet, creating it");
                T::default()
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to read JSON blob, reinitializing");
                T::default()
            }
        };

        if let Err(e) = self.save(&loaded).await {
            warn!(error = %e, path = %path.display(), "failed to write back reinitialized blob");
        }
        loaded
    }

    /// Writes the value through a temp file and rename.
    pub async fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), PersistError> {
        if self.path.is_none() {
            debug!("in-memory blob; skipping persist");
            return Ok(());
        }
        let bytes = serde_json::to_vec_pretty(value)?;
        self.save_raw(&bytes).await
    }

    /// Writes already-encoded bytes verbatim.
    pub async fn save_raw(&self, bytes: &[u8]) -> Result<(), PersistError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
