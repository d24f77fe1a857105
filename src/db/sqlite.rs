//! SQLite implementation of the record store traits
//!
//! All datetimes are stored as `YYYY-MM-DD HH:MM:SS` text and dates as `YYYY-MM-DD`,
//! so range predicates compare lexicographically.

use super::{run_schema_migrations, RankingQuery, RepositoryStore, TagStore, TrendingStore};
use crate::error::StoreError;
use crate::model::{
    AggregateRanking, Owner, Repository, RepositoryDetails, Tag, TrendingFilter, TrendingRecord,
};
use crate::query::{fold_rows, Direction, QueryArg, QueryBuilder, RenderedQuery};
use crate::window::{format_datetime, SyncWindow, DATETIME_FORMAT, DATE_FORMAT};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSqlOutput, Type};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const REPOSITORY_COLUMNS: &str = "repositories.id, repositories.ghr_id, repositories.stars, \
    repositories.forks, repositories.full_name, repositories.language, repositories.owner, \
    repositories.owner_avatar_url, repositories.created_at, repositories.updated_at, \
    repositories.description, repositories.default_branch";

/// Number of columns in [`REPOSITORY_COLUMNS`]
const REPOSITORY_COLUMN_COUNT: usize = 12;

impl ToSql for QueryArg {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            QueryArg::Int(v) => Ok(ToSqlOutput::from(*v)),
            QueryArg::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

/// SQLite-backed record store
///
/// The connection is opened once at process start and shared by every handler;
/// it closes when the last clone is dropped.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database and bring its schema up to date
    pub fn open(db_path: impl AsRef<Path>, schema_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Self::init(conn, schema_dir)
    }

    pub fn open_in_memory(schema_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, schema_dir)
    }

    fn init(mut conn: Connection, schema_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        run_schema_migrations(&mut conn, schema_dir)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Execute a composed query and map each row
    fn execute_query<T, F>(&self, query: &RenderedQuery, map: F) -> Result<Vec<T>, StoreError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&query.sql)?;
        let rows = stmt.query_map(params_from_iter(query.args.iter()), map)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn select_repositories(&self, qb: &QueryBuilder) -> Result<Vec<Repository>, StoreError> {
        self.execute_query(&qb.render(), repository_from_row)
    }
}

fn conversion_error(idx: usize, err: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    Ok(Repository {
        id: row.get(0)?,
        ghr_id: row.get(1)?,
        stars: row.get(2)?,
        forks: row.get(3)?,
        full_name: row.get(4)?,
        language: row.get(5)?,
        owner: Owner {
            name: row.get(6)?,
            avatar_url: row.get(7)?,
        },
        created_at: get_datetime(row, 8)?,
        updated_at: get_datetime(row, 9)?,
        description: row.get(10)?,
        default_branch: row.get(11)?,
        tags: Vec::new(),
    })
}

fn trending_from_row(row: &Row<'_>) -> rusqlite::Result<TrendingRecord> {
    Ok(TrendingRecord {
        id: Some(row.get(0)?),
        item_key: row.get(1)?,
        trend_date: get_date(row, 2)?,
        rank: row.get(3)?,
        language: row.get(4)?,
        scraped_at: get_datetime(row, 5)?,
    })
}

fn repository_select() -> QueryBuilder {
    QueryBuilder::new(format!("SELECT {} FROM repositories", REPOSITORY_COLUMNS))
}

#[async_trait]
impl TrendingStore for SqliteStore {
    async fn select_trending(&self, query: &RenderedQuery) -> Result<Vec<TrendingRecord>, StoreError> {
        self.execute_query(query, trending_from_row)
    }

    async fn insert_trending(&self, record: &TrendingRecord) -> Result<i64, StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO trending_repositories (repo_full_name, trend_date, rank, language, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.item_key,
                format_date(&record.trend_date),
                record.rank,
                record.language,
                format_datetime(&record.scraped_at),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn update_trending(&self, record: &TrendingRecord) -> Result<(), StoreError> {
        let id = record.id.ok_or_else(|| {
            StoreError::InvalidRow(format!("trending record at rank {} has no id", record.rank))
        })?;

        let conn = self.lock()?;

        let n = conn.execute(
            "UPDATE trending_repositories
             SET repo_full_name = ?1, trend_date = ?2, rank = ?3, language = ?4, scraped_at = ?5
             WHERE id = ?6",
            params![
                record.item_key,
                format_date(&record.trend_date),
                record.rank,
                record.language,
                format_datetime(&record.scraped_at),
                id,
            ],
        )?;

        if n != 1 {
            return Err(StoreError::InvalidRow(format!(
                "unexpected number of rows affected updating trending record {}: {}",
                id, n
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RepositoryStore for SqliteStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Repository>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM repositories WHERE id = ?1", REPOSITORY_COLUMNS);
        let repo = conn.query_row(&sql, [id], repository_from_row).optional()?;
        Ok(repo)
    }

    async fn find_by_name(&self, full_name: &str) -> Result<Option<Repository>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM repositories WHERE full_name = ?1", REPOSITORY_COLUMNS);
        let repo = conn.query_row(&sql, [full_name], repository_from_row).optional()?;
        Ok(repo)
    }

    async fn find_by_names(&self, full_names: &[String]) -> Result<Vec<Repository>, StoreError> {
        if full_names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; full_names.len()].join(", ");

        let mut qb = repository_select();
        qb.filter(
            format!("repositories.full_name IN ({})", placeholders),
            full_names.iter().cloned().map(QueryArg::from),
        );
        qb.order_by("repositories.id", Direction::Asc);

        self.select_repositories(&qb)
    }

    async fn find_all(&self, window: &SyncWindow) -> Result<Vec<Repository>, StoreError> {
        let mut qb = repository_select();

        if let Some(start) = &window.start {
            qb.filter("repositories.updated_at > ?", [QueryArg::from(format_datetime(start))]);
        }

        if let Some(end) = &window.end {
            qb.filter("repositories.updated_at <= ?", [QueryArg::from(format_datetime(end))]);
        }

        qb.order_by("repositories.id", Direction::Asc);

        if let Some(limit) = window.limit {
            qb.limit(limit);
        }

        self.select_repositories(&qb)
    }

    async fn find_all_with_tags(&self, filter: TrendingFilter) -> Result<Vec<Repository>, StoreError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {}, tags.id, tags.name FROM repositories
             LEFT JOIN repositories_tags ON repositories.id = repositories_tags.repository_id
             LEFT JOIN tags ON repositories_tags.tag_id = tags.id",
            REPOSITORY_COLUMNS
        ));

        if let TrendingFilter::On(date) = filter {
            qb.filter(
                "repositories.full_name IN (SELECT repo_full_name FROM trending_repositories WHERE trend_date = ?)",
                [QueryArg::from(format_date(&date))],
            );
        }

        qb.order_by("repositories.id", Direction::Asc)
            .order_by("tags.id", Direction::Asc);

        let rows = self.execute_query(&qb.render(), |row| {
            let repo = repository_from_row(row)?;
            let tag_id: Option<i64> = row.get(REPOSITORY_COLUMN_COUNT)?;
            let tag_name: Option<String> = row.get(REPOSITORY_COLUMN_COUNT + 1)?;

            let tag = match (tag_id, tag_name) {
                (Some(id), Some(name)) => Some(Tag { id, name }),
                _ => None,
            };

            Ok((repo, tag))
        })?;

        Ok(fold_rows(rows))
    }

    async fn find_trending(&self, query: &RankingQuery) -> Result<Vec<AggregateRanking>, StoreError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {}, COUNT(*) AS featured_count, MIN(trending_repositories.rank) AS best_ranking
             FROM repositories
             JOIN trending_repositories ON repositories.full_name = trending_repositories.repo_full_name",
            REPOSITORY_COLUMNS
        ));

        qb.order_by("featured_count", Direction::Desc)
            .order_by("best_ranking", Direction::Asc)
            .order_by("repositories.id", Direction::Asc);

        match &query.language {
            Some(language) => {
                qb.filter("trending_repositories.language = ?", [QueryArg::from(language.as_str())]);
            }
            None => {
                qb.filter("trending_repositories.language IS NULL", []);
            }
        }

        if let Some(since) = &query.since {
            qb.filter("trending_repositories.trend_date > ?", [QueryArg::from(format_date(since))]);
        }

        if let Some(limit) = query.limit {
            qb.limit(limit);
        }

        qb.group_by("repositories.id");

        self.execute_query(&qb.render(), |row| {
            Ok(AggregateRanking {
                repository: repository_from_row(row)?,
                featured_count: row.get(REPOSITORY_COLUMN_COUNT)?,
                best_ranking: row.get(REPOSITORY_COLUMN_COUNT + 1)?,
            })
        })
    }

    async fn save(&self, details: &RepositoryDetails, now: NaiveDateTime) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        let now = format_datetime(&now);

        conn.execute(
            "INSERT INTO repositories (full_name, ghr_id, stars, forks, language, owner, owner_avatar_url,
                                       description, default_branch, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                details.full_name,
                details.ghr_id,
                details.stars,
                details.forks,
                details.language,
                details.owner.name,
                details.owner.avatar_url,
                details.description,
                details.default_branch,
                now,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn update(&self, id: i64, details: &RepositoryDetails, now: NaiveDateTime) -> Result<(), StoreError> {
        let conn = self.lock()?;

        let n = conn.execute(
            "UPDATE repositories
             SET full_name = ?1, ghr_id = ?2, stars = ?3, forks = ?4, language = ?5, owner = ?6,
                 owner_avatar_url = ?7, description = ?8, default_branch = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                details.full_name,
                details.ghr_id,
                details.stars,
                details.forks,
                details.language,
                details.owner.name,
                details.owner.avatar_url,
                details.description,
                details.default_branch,
                format_datetime(&now),
                id,
            ],
        )?;

        if n != 1 {
            return Err(StoreError::InvalidRow(format!(
                "unexpected number of rows affected updating repository {}: {}",
                id, n
            )));
        }

        Ok(())
    }

    async fn save_tags(&self, repository_id: i64, tags: &[Tag]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;

        // Dropping `tx` on an early return rolls back the delete as well
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM repositories_tags WHERE repository_id = ?1",
            [repository_id],
        )?;

        for tag in tags {
            tx.execute(
                "INSERT INTO repositories_tags (repository_id, tag_id) VALUES (?1, ?2)",
                [repository_id, tag.id],
            )?;
        }

        tx.commit()?;

        log::debug!("🏷️  Saved {} tags for repository {}", tags.len(), repository_id);
        Ok(())
    }
}

#[async_trait]
impl TagStore for SqliteStore {
    async fn save_tag(&self, name: &str) -> Result<Tag, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidRow("tag name must not be empty".to_string()));
        }

        let conn = self.lock()?;
        conn.execute("INSERT INTO tags (name) VALUES (?1)", [name])?;

        Ok(Tag {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn find_all_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY id ASC")?;
        let tags = stmt
            .query_map([], |row| Ok(Tag { id: row.get(0)?, name: row.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }
}
