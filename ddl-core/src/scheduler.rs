use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::engine::Engine;
use crate::error::SchedulerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How often the catalog loop checks whether a refresh is due.
    pub catalog_tick: Duration,
    pub catalog_refresh_interval: Duration,
    /// How often the notification loop checks whether a pass is due.
    pub notify_tick: Duration,
    pub notification_interval: Duration,
    /// Wait after a failed notification pass.
    pub notify_error_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            catalog_tick: Duration::from_secs(60),
            catalog_refresh_interval: Duration::from_secs(600),
            notify_tick: Duration::from_secs(10),
            notification_interval: Duration::from_secs(10),
            notify_error_backoff: Duration::from_secs(180),
        }
    }
}

impl SchedulerConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            catalog_refresh_interval: config.update_interval(),
            ..Self::default()
        }
    }
}

/// Handle to the two background loops.
pub struct SchedulerHandle {
    cancel_tx: broadcast::Sender<()>,
    catalog: JoinHandle<()>,
    notify: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals both loops and waits for them. A loop busy with a fetch or a
    /// pass finishes it before observing the signal.
    pub async fn stop(self) -> Result<(), SchedulerError> {
        let _ = self.cancel_tx.send(());
        let catalog = self.catalog.await;
        let notify = self.notify.await;
        catalog?;
        notify?;
        Ok(())
    }
}

pub fn spawn_scheduler(engine: Engine, config: SchedulerConfig) -> SchedulerHandle {
    let (cancel_tx, _) = broadcast::channel(1);
    let catalog = tokio::spawn(catalog_loop(engine.clone(), config, cancel_tx.subscribe()));
    let notify = tokio::spawn(notify_loop(engine, config, cancel_tx.subscribe()));
    SchedulerHandle {
        cancel_tx,
        catalog,
        notify,
    }
}

async fn catalog_loop(engine: Engine, config: SchedulerConfig, mut cancel_rx: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(config.catalog_tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel_rx.recv() => {
                info!("catalog loop shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                if !engine
                    .catalog_refresh_due(Utc::now(), config.catalog_refresh_interval)
                    .await
                {
                    continue;
                }
                info!("catalog refresh due, fetching remote data");
                if let Err(err) = engine.refresh_catalog().await {
                    warn!(error = %err, "catalog refresh failed, keeping current data");
                }
            }
        }
    }
}

async fn notify_loop(engine: Engine, config: SchedulerConfig, mut cancel_rx: broadcast::Receiver<()>) {
    loop {
        let mut wait = config.notify_tick;
        if engine
            .notification_pass_due(Utc::now(), config.notification_interval)
            .await
        {
            if let Err(err) = engine.notification_pass().await {
                warn!(error = %err, backoff = ?config.notify_error_backoff, "notification pass failed");
                wait = config.notify_error_backoff;
            }
        }

        tokio::select! {
            _ = cancel_rx.recv() => {
                info!("notification loop shutdown requested");
                break;
            }
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
