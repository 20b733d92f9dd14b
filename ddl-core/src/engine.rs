use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::catalog::{load_cache, shared_catalog, Catalog, CatalogDocument, SharedCatalog};
use crate::config::AppConfig;
use crate::detect::{detect_changes, find_upcoming, NOTIFY_WINDOW_DAYS};
use crate::dispatch::{dispatch, Deliver, ReminderLog};
use crate::error::{CommandError, FetchError, PersistError};
use crate::fetch::fetch_document;
use crate::known::KnownStore;
use crate::program::Program;
use crate::storage::BlobFile;
use crate::subscriptions::SubscriptionRegistry;

const SOURCES_FILE: &str = "sources.json";
const SUBSCRIPTIONS_FILE: &str = "subscriptions.json";
const KNOWN_FILE: &str = "known_programs.json";

/// When the two background activities last completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshState {
    pub last_catalog_refresh: Option<DateTime<Utc>>,
    pub last_notification_pass: Option<DateTime<Utc>>,
}

/// Outcome of one notification pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub new_programs: Vec<Program>,
    pub upcoming: Vec<Program>,
    pub delivered: usize,
    pub failed: usize,
}

/// Owns all shared state: catalog, known identities, subscriptions and
/// refresh timestamps. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Engine {
    config: Arc<AppConfig>,
    client: Client,
    sink: Arc<dyn Deliver>,
    catalog: SharedCatalog,
    catalog_cache: BlobFile,
    known: KnownStore,
    subscriptions: SubscriptionRegistry,
    refresh: Arc<RwLock<RefreshState>>,
    pass_lock: Arc<Mutex<()>>,
    /// Closing-soon announcements delivered in this process.
    reminded: Arc<Mutex<ReminderLog>>,
}

impl Engine {
    /// Engine with nothing persisted to disk.
    pub fn in_memory(config: AppConfig, client: Client, sink: Arc<dyn Deliver>) -> Self {
        Self {
            config: Arc::new(config),
            client,
            sink,
            catalog: shared_catalog(Catalog::default()),
            catalog_cache: BlobFile::in_memory(),
            known: KnownStore::in_memory(),
            subscriptions: SubscriptionRegistry::in_memory(),
            refresh: Arc::new(RwLock::new(RefreshState::default())),
            pass_lock: Arc::new(Mutex::new(())),
            reminded: Arc::new(Mutex::new(ReminderLog::default())),
        }
    }

    /// Restores subscriptions, known identities and the catalog cache from
    /// `dir`. The cache file's mtime counts as the last catalog refresh.
    pub async fn load_from_dir(
        config: AppConfig,
        client: Client,
        sink: Arc<dyn Deliver>,
        dir: impl AsRef<Path>,
    ) -> Self {
        let dir = dir.as_ref();
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(error = %e, path = %dir.display(), "failed to create data dir");
        }

        let sources_path = dir.join(SOURCES_FILE);
        let subscriptions = SubscriptionRegistry::load_from(dir.join(SUBSCRIPTIONS_FILE)).await;
        let known = KnownStore::load_from(dir.join(KNOWN_FILE)).await;

        let mut refresh = RefreshState::default();
        let catalog = match load_cache(&sources_path).await {
            Some((document, modified)) => {
                refresh.last_catalog_refresh = Some(DateTime::<Utc>::from(modified));
                Catalog::from_document(document)
            }
            None => Catalog::default(),
        };

        Self {
            config: Arc::new(config),
            client,
            sink,
            catalog: shared_catalog(catalog),
            catalog_cache: BlobFile::at(sources_path),
            known,
            subscriptions,
            refresh: Arc::new(RwLock::new(refresh)),
            pass_lock: Arc::new(Mutex::new(())),
            reminded: Arc::new(Mutex::new(ReminderLog::default())),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    pub fn known(&self) -> &KnownStore {
        &self.known
    }

    /// Consistent copy of the catalog; never observes a half-applied refresh.
    pub async fn catalog(&self) -> Catalog {
        self.catalog.read().await.clone()
    }

    pub async fn refresh_state(&self) -> RefreshState {
        *self.refresh.read().await
    }

    /// Installs a decoded document as the current catalog.
    pub async fn replace_catalog(&self, document: CatalogDocument) {
        self.catalog.write().await.replace_from(document);
    }

    pub async fn set_default_source(&self, name: &str) -> Result<(), CommandError> {
        self.catalog.write().await.set_default(name)
    }

    /// Fetches the remote document, mirrors it to the cache and swaps it in.
    /// On failure the current catalog and refresh time stay as they were.
    pub async fn refresh_catalog(&self) -> Result<usize, FetchError> {
        let remote = fetch_document(&self.client, &self.config.remote_url).await?;

        if let Err(e) = self.catalog_cache.save_raw(&remote.raw).await {
            warn!(error = %e, "failed to write catalog cache");
        }

        let sources = remote.document.0.len();
        self.replace_catalog(remote.document).await;
        self.refresh.write().await.last_catalog_refresh = Some(Utc::now());
        info!(sources, "catalog refreshed from remote");
        Ok(sources)
    }

    pub async fn catalog_refresh_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        elapsed_at_least(self.refresh.read().await.last_catalog_refresh, now, interval)
    }

    pub async fn notification_pass_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        elapsed_at_least(self.refresh.read().await.last_notification_pass, now, interval)
    }

    pub async fn notification_pass(&self) -> Result<PassReport, PersistError> {
        self.notification_pass_at(Utc::now()).await
    }

    /// Detects new and soon-closing programs, replaces the known set and
    /// notifies subscribers. Passes never overlap. Each subscriber is told
    /// about a closing-soon program once per process while it stays inside
    /// the window.
    ///
    /// If persisting the known set fails, the in-memory set is still
    /// replaced and dispatch still happens; the error is returned afterwards.
    pub async fn notification_pass_at(&self, now: DateTime<Utc>) -> Result<PassReport, PersistError> {
        let _pass = self.pass_lock.lock().await;

        let programs = {
            let catalog = self.catalog.read().await;
            if !catalog.is_loaded() {
                debug!("catalog not loaded yet, skipping notification pass");
                drop(catalog);
                self.refresh.write().await.last_notification_pass = Some(now);
                return Ok(PassReport::default());
            }
            catalog.all_programs()
        };

        let known = self.known.snapshot().await;
        let changes = detect_changes(&programs, &known);
        let upcoming = find_upcoming(&programs, now, chrono::Duration::days(NOTIFY_WINDOW_DAYS));
        let persisted = self.known.replace(changes.known).await;

        let mut report = PassReport {
            new_programs: changes.new_programs,
            upcoming,
            ..PassReport::default()
        };

        let subscribers = self.subscriptions.all().await;
        if subscribers.is_empty() {
            info!(new = report.new_programs.len(), "no subscribers, skipping dispatch");
        } else {
            let mut reminded = self.reminded.lock().await;
            let outcome = dispatch(
                &report.new_programs,
                &report.upcoming,
                &subscribers,
                &mut reminded,
                self.sink.as_ref(),
                now,
            )
            .await;
            report.delivered = outcome.delivered;
            report.failed = outcome.failed;
        }

        persisted?;
        self.refresh.write().await.last_notification_pass = Some(now);
        info!(
            new = report.new_programs.len(),
            upcoming = report.upcoming.len(),
            delivered = report.delivered,
            failed = report.failed,
            "notification pass complete"
        );
        Ok(report)
    }

    /// Writes subscriptions and known identities to disk.
    pub async fn flush(&self) {
        self.subscriptions.flush().await;
        if let Err(e) = self.known.persist().await {
            warn!(error = %e, "failed to persist known identities");
        }
    }
}

fn elapsed_at_least(last: Option<DateTime<Utc>>, now: DateTime<Utc>, interval: Duration) -> bool {
    match last {
        None => true,
        Some(last) => (now - last)
            .to_std()
            .map(|elapsed| elapsed >= interval)
            .unwrap_or(false),
    }
}
