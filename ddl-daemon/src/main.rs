use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use ddl_core::{spawn_scheduler, AppConfig, Deliver, DeliveryError, Engine, SchedulerConfig};
use reqwest::{redirect, ClientBuilder};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Delivery sink that writes notifications to the log. A chat front-end
/// would provide its own `Deliver` implementation.
struct LogSink;

#[async_trait]
impl Deliver for LogSink {
    async fn deliver(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        info!(target: "notify", recipient, "\n{text}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let dir = data_dir();
    let config = AppConfig::load(&dir);
    let client = ClientBuilder::new()
        .redirect(redirect::Policy::limited(5))
        .timeout(config.request_timeout())
        .user_agent(concat!("ddlwatch/", env!("CARGO_PKG_VERSION")))
        .build()?;

    info!(dir = %dir.display(), url = %config.remote_url, "starting deadline watcher");
    let scheduler_config = SchedulerConfig::from_app(&config);
    let engine = Engine::load_from_dir(config, client, Arc::new(LogSink), &dir).await;
    let scheduler = spawn_scheduler(engine.clone(), scheduler_config);

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    scheduler.stop().await?;
    engine.flush().await;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// First CLI argument, then `DDLWATCH_DIR`, then the platform config dir.
fn data_dir() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("DDLWATCH_DIR").map(PathBuf::from))
        .unwrap_or_else(AppConfig::default_dir)
}
