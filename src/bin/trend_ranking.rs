//! Trend Ranking - print the aggregate ranking as JSON
//!
//! One entry per repository featured in the last `RANKING_DAYS` days: how many times it
//! was featured and its best rank, most featured first.
//!
//! Usage:
//!   RANKING_LANGUAGE=rust RANKING_LIMIT=10 cargo run --bin trend_ranking

use dotenv::dotenv;
use log::info;
use trendsync::config::SyncConfig;
use trendsync::db::{RepositoryStore, SqliteStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SyncConfig::from_env()?;
    let query = config.ranking_query(chrono::Local::now().naive_local());

    info!(
        "📊 Ranking for {} since {}",
        query.language.as_deref().unwrap_or("all languages"),
        query.since.map(|d| d.to_string()).unwrap_or_else(|| "the beginning".to_string())
    );

    let store = SqliteStore::open(&config.db_path, &config.schema_dir)?;
    let ranking = store.find_trending(&query).await?;

    println!("{}", serde_json::to_string_pretty(&ranking)?);

    info!("✅ {} repositories ranked", ranking.len());
    Ok(())
}
