//! Record store interface
//!
//! The reconciliation engine and the sync handlers only see these traits; `SqliteStore`
//! is the production implementation.
//!
//! Tables (see `/sql/`):
//! - `repositories` - one row per repository, natural key `full_name`
//! - `tags`, `repositories_tags` - tag catalogue and per-repository associations
//! - `trending_repositories` - one row per rank slot

pub mod sqlite;

use crate::error::StoreError;
use crate::model::{AggregateRanking, Repository, RepositoryDetails, Tag, TrendingFilter, TrendingRecord};
use crate::query::RenderedQuery;
use crate::window::SyncWindow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

pub use sqlite::SqliteStore;

/// Column list a `select_trending` query must project, in this order
pub const TRENDING_SELECT: &str =
    "SELECT id, repo_full_name, trend_date, rank, language, scraped_at FROM trending_repositories";

#[async_trait]
pub trait TrendingStore: Send + Sync {
    /// Execute a composed query whose base is [`TRENDING_SELECT`]
    async fn select_trending(&self, query: &RenderedQuery) -> Result<Vec<TrendingRecord>, StoreError>;

    /// Insert a new rank slot, returning its storage id
    async fn insert_trending(&self, record: &TrendingRecord) -> Result<i64, StoreError>;

    /// Overwrite an existing rank slot; `record.id` must be set
    async fn update_trending(&self, record: &TrendingRecord) -> Result<(), StoreError>;
}

/// Parameters of the aggregate ranking query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingQuery {
    /// `None` selects the "all languages" ranking
    pub language: Option<String>,
    pub limit: Option<u32>,
    /// Only trend dates strictly after this one participate
    pub since: Option<NaiveDate>,
}

impl RankingQuery {
    /// Ranking over the last `days` days before `today`; 0 days or 0 limit mean unbounded
    pub fn last_days(language: Option<String>, limit: u32, days: u32, today: NaiveDate) -> Self {
        let since = if days > 0 {
            today.checked_sub_days(chrono::Days::new(u64::from(days)))
        } else {
            None
        };

        Self {
            language,
            limit: (limit > 0).then_some(limit),
            since,
        }
    }
}

#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Repository>, StoreError>;

    async fn find_by_name(&self, full_name: &str) -> Result<Option<Repository>, StoreError>;

    async fn find_by_names(&self, full_names: &[String]) -> Result<Vec<Repository>, StoreError>;

    /// Repositories whose `updated_at` falls in `(start, end]`, oldest id first
    async fn find_all(&self, window: &SyncWindow) -> Result<Vec<Repository>, StoreError>;

    /// Repositories with their tags, in first-seen order
    async fn find_all_with_tags(&self, filter: TrendingFilter) -> Result<Vec<Repository>, StoreError>;

    /// Occurrence count and best rank per repository, most featured first
    async fn find_trending(&self, query: &RankingQuery) -> Result<Vec<AggregateRanking>, StoreError>;

    async fn save(&self, details: &RepositoryDetails, now: NaiveDateTime) -> Result<i64, StoreError>;

    async fn update(&self, id: i64, details: &RepositoryDetails, now: NaiveDateTime) -> Result<(), StoreError>;

    /// Replace a repository's tag set atomically; on failure the previous set is kept
    async fn save_tags(&self, repository_id: i64, tags: &[Tag]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn save_tag(&self, name: &str) -> Result<Tag, StoreError>;

    async fn find_all_tags(&self) -> Result<Vec<Tag>, StoreError>;
}

/// Run schema migrations from SQL files
///
/// Executes every `.sql` file in `schema_dir` in file-name order (`00_`, `01_`, ...).
/// Files must use `IF NOT EXISTS` so reruns are no-ops.
pub fn run_schema_migrations(conn: &mut Connection, schema_dir: impl AsRef<Path>) -> Result<(), StoreError> {
    let schema_path = schema_dir.as_ref();

    if !schema_path.exists() {
        return Err(StoreError::Migration(format!(
            "schema directory not found: {}",
            schema_path.display()
        )));
    }

    // In-memory databases answer "memory" here, which is fine
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    log::debug!("📊 SQLite journal mode: {}", journal_mode);

    let mut sql_files: Vec<_> = fs::read_dir(schema_path)
        .map_err(|e| StoreError::Migration(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();

    sql_files.sort_by_key(|entry| entry.file_name());

    log::info!("🔧 Running schema migrations from: {}", schema_path.display());

    for entry in sql_files {
        let path = entry.path();
        let filename = entry.file_name().to_string_lossy().into_owned();

        log::debug!("   ├─ Executing: {}", filename);

        let sql_content = fs::read_to_string(&path)
            .map_err(|e| StoreError::Migration(format!("{}: {}", filename, e)))?;

        conn.execute_batch(&sql_content)
            .map_err(|e| StoreError::Migration(format!("{}: {}", filename, e)))?;
    }

    log::info!("✅ Schema migrations completed");

    Ok(())
}
