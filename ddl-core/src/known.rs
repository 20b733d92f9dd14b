use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::error::PersistError;
use crate::storage::BlobFile;

/// Identities of every program seen as of the last notification pass.
#[derive(Debug, Clone)]
pub struct KnownStore {
    inner: Arc<RwLock<HashSet<String>>>,
    blob: BlobFile,
}

impl KnownStore {
    pub fn in_memory() -> Self {
        Self::with_blob(HashSet::new(), BlobFile::in_memory())
    }

    pub fn with_identities(identities: HashSet<String>) -> Self {
        Self::with_blob(identities, BlobFile::in_memory())
    }

    pub async fn load_from(path: impl AsRef<Path>) -> Self {
        let blob = BlobFile::at(path);
        let identities: Vec<String> = blob.load_or_reset().await;
        info!(count = identities.len(), "loaded known program identities");
        Self::with_blob(identities.into_iter().collect(), blob)
    }

    fn with_blob(identities: HashSet<String>, blob: BlobFile) -> Self {
        Self {
            inner: Arc::new(RwLock::new(identities)),
            blob,
        }
    }

    pub async fn snapshot(&self) -> HashSet<String> {
        self.inner.read().await.clone()
    }

    pub async fn contains(&self, identity: &str) -> bool {
        self.inner.read().await.contains(identity)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Replaces the whole set and persists it. The in-memory set stays
    /// replaced even if the write fails.
    pub async fn replace(&self, identities: HashSet<String>) -> Result<(), PersistError> {
        let mut inner = self.inner.write().await;
        *inner = identities;
        self.blob.save(&sorted(&inner)).await
    }

    pub async fn persist(&self) -> Result<(), PersistError> {
        let inner = self.inner.read().await;
        self.blob.save(&sorted(&inner)).await
    }
}

fn sorted(identities: &HashSet<String>) -> Vec<&String> {
    let mut list: Vec<&String> = identities.iter().collect();
    list.sort();
    list
}
