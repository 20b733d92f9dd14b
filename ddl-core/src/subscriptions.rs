use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::storage::BlobFile;

/// Tags a subscriber filters on. Empty means every program.
pub type TagFilter = BTreeSet<String>;

pub type SubscriptionMap = BTreeMap<String, TagFilter>;

/// Subscriber handle -> tag filter, persisted after every mutation.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<RwLock<SubscriptionMap>>,
    blob: BlobFile,
}

impl SubscriptionRegistry {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SubscriptionMap::new())),
            blob: BlobFile::in_memory(),
        }
    }

    pub async fn load_from(path: impl AsRef<Path>) -> Self {
        let blob = BlobFile::at(path);
        let map: SubscriptionMap = blob.load_or_reset().await;
        info!(subscribers = map.len(), "loaded subscriptions");
        Self {
            inner: Arc::new(RwLock::new(map)),
            blob,
        }
    }

    /// Creates or overwrites the subscriber's filter. Last write wins.
    pub async fn subscribe(&self, subscriber: &str, tags: TagFilter) {
        let mut inner = self.inner.write().await;
        inner.insert(subscriber.to_string(), tags);
        self.persist_locked(&inner).await;
    }

    /// Returns whether the subscriber had an entry.
    pub async fn unsubscribe(&self, subscriber: &str) -> bool {
        let mut inner = self.inner.write().await;
        let existed = inner.remove(subscriber).is_some();
        if existed {
            self.persist_locked(&inner).await;
        }
        existed
    }

    pub async fn status_of(&self, subscriber: &str) -> Option<TagFilter> {
        self.inner.read().await.get(subscriber).cloned()
    }

    pub async fn all(&self) -> SubscriptionMap {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn flush(&self) {
        let inner = self.inner.read().await;
        self.persist_locked(&inner).await;
    }

    // Called with the registry lock held so file order matches mutation order.
    async fn persist_locked(&self, map: &SubscriptionMap) {
        if let Err(e) = self.blob.save(map).await {
            warn!(error = %e, "failed to persist subscriptions");
        }
    }
}
