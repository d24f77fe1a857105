//! Trend Scrape - fetch trending rankings and reconcile them into rank slots
//!
//! For every language in `TRENDSYNC_LANGUAGES`: fetch the GitHub trending page, reconcile
//! today's slots, then register repositories that have no details row yet.
//!
//! Usage:
//!   cargo run --release --bin trend_scrape
//!
//! Environment variables:
//!   TRENDSYNC_DB_PATH - SQLite database path (default: trendsync.db)
//!   TRENDSYNC_LANGUAGES - comma list, empty entry = all languages (default: "")
//!   GITHUB_TOKEN - optional API token used when registering new repositories

use dotenv::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use trendsync::config::SyncConfig;
use trendsync::db::SqliteStore;
use trendsync::github::{GitHubClient, RepositorySync};
use trendsync::trending::{GitHubTrendingSource, Reconciler, ScrapeHandler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Trend Scrape");

    let config = SyncConfig::from_env()?;
    info!("   ├─ Database: {}", config.db_path.display());
    info!("   ├─ Languages: {:?}", config.languages);
    info!("   └─ GitHub token: {}", if config.github_token.is_some() { "set" } else { "not set" });

    let store = Arc::new(SqliteStore::open(&config.db_path, &config.schema_dir)?);
    info!("✅ Database initialized");

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⚠️  Interrupt received, stopping after the current call");
            shutdown.cancel();
        }
    });

    let source = Arc::new(GitHubTrendingSource::new(config.http_timeout)?);
    let handler = ScrapeHandler::new(source, Reconciler::new(store.clone()));

    let results = match handler.scrape_all(&config.languages, &cancel).await {
        Ok(results) => results,
        Err(e) => {
            if e.is_cancelled() {
                warn!("⚠️  Interrupted, partial results kept");
            } else {
                error!("❌ Scrape failed: {}", e);
            }
            return Err(e.into());
        }
    };

    let keys: Vec<String> = results.into_iter().flat_map(|(snapshot, _)| snapshot).collect();

    let client = Arc::new(GitHubClient::new(
        config.github_api_url.as_str(),
        config.github_token.as_deref(),
        config.http_timeout,
    )?);
    let sync = RepositorySync::new(store, client);

    match sync.register_missing(&keys, &cancel).await {
        Ok(report) => {
            info!("✅ Registered {} new repositories ({} seen)", report.written, report.checked);
            Ok(())
        }
        Err(e) => {
            if e.is_cancelled() {
                warn!("⚠️  Interrupted, partial results kept");
            } else {
                error!("❌ Registering repositories failed: {}", e);
            }
            Err(e.into())
        }
    }
}
