//! Core data structures
//!
//! - `TrendingRecord` - one rank slot of one day's ranking (`trending_repositories`)
//! - `Repository` / `Tag` - persisted repository with its owned tag list
//! - `AggregateRanking` - derived "featured N times, best rank R" view, never stored

use crate::query::Nested;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Normalise a language filter: trimmed, lowercased, empty means "all languages"
pub fn normalize_language(language: &str) -> Option<String> {
    let language = language.trim();
    if language.is_empty() {
        None
    } else {
        Some(language.to_lowercase())
    }
}

/// One rank slot: at most one per `(trend_date, language, rank)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendingRecord {
    /// Storage-assigned id, `None` until inserted
    pub id: Option<i64>,
    pub trend_date: NaiveDate,
    pub rank: u32,
    pub language: Option<String>,
    pub item_key: String,
    pub scraped_at: NaiveDateTime,
}

impl TrendingRecord {
    pub fn new(
        rank: u32,
        item_key: impl Into<String>,
        language: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: None,
            trend_date: now.date(),
            rank,
            language,
            item_key: item_key.into(),
            scraped_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    /// GitHub's numeric repository id
    pub ghr_id: i64,
    pub stars: i64,
    pub forks: i64,
    pub full_name: String,
    pub language: Option<String>,
    pub owner: Owner,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub description: Option<String>,
    pub default_branch: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Nested for Repository {
    type Key = i64;
    type Child = Tag;

    fn key(&self) -> i64 {
        self.id
    }

    fn push_child(&mut self, tag: Tag) {
        self.tags.push(tag);
    }
}

/// Repository details as fetched from upstream, before persistence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryDetails {
    pub ghr_id: i64,
    pub full_name: String,
    pub stars: i64,
    pub forks: i64,
    pub language: Option<String>,
    pub owner: Owner,
    pub description: Option<String>,
    pub default_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateRanking {
    #[serde(flatten)]
    pub repository: Repository,
    pub featured_count: i64,
    pub best_ranking: i64,
}

/// Which repositories `find_all_with_tags` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendingFilter {
    /// Repositories featured in any ranking on the given date
    On(NaiveDate),
    All,
}
