//! Repo Sync - refresh repository details inside a time window
//!
//! Usage:
//!   SYNC_START="2024-01-01 00:00:00" SYNC_END=-1d SYNC_LIMIT=100 cargo run --bin repo_sync
//!
//! Environment variables:
//!   SYNC_START - absolute lower bound, exclusive (default: unbounded)
//!   SYNC_END - absolute or relative (`-2d`, `6h`) upper bound, inclusive (default: unbounded)
//!   SYNC_LIMIT - maximum repositories per run, 0 = unbounded (default: 0)

use dotenv::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use trendsync::config::SyncConfig;
use trendsync::db::SqliteStore;
use trendsync::github::{GitHubClient, RepositorySync};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Repo Sync");

    let config = SyncConfig::from_env()?;
    let window = config.sync_window(chrono::Local::now().naive_local())?;
    info!("   ├─ Database: {}", config.db_path.display());
    info!("   └─ Window: {}", window);

    if window.is_unbounded() {
        warn!("⚠️  No SYNC_START/SYNC_END/SYNC_LIMIT set, syncing every repository");
    }

    let store = Arc::new(SqliteStore::open(&config.db_path, &config.schema_dir)?);
    let client = Arc::new(GitHubClient::new(
        config.github_api_url.as_str(),
        config.github_token.as_deref(),
        config.http_timeout,
    )?);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⚠️  Interrupt received, stopping after the current call");
            shutdown.cancel();
        }
    });

    match RepositorySync::new(store, client).sync_window(&window, &cancel).await {
        Ok(report) => {
            info!("✅ Synced {}/{} repositories", report.written, report.checked);
            Ok(())
        }
        Err(e) => {
            if e.is_cancelled() {
                warn!("⚠️  Interrupted, partial results kept");
            } else {
                error!("❌ Sync failed: {}", e);
            }
            Err(e.into())
        }
    }
}
