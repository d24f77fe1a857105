//! Runtime configuration from environment variables
//!
//! Every binary calls `dotenv().ok()` first, so a `.env` file in the working directory
//! is honoured.

use crate::db::RankingQuery;
use crate::error::SyncError;
use crate::model::normalize_language;
use crate::window::SyncWindow;
use chrono::NaiveDateTime;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Directory holding the `NN_*.sql` migrations
    pub schema_dir: PathBuf,

    /// Rankings to scrape; `None` is the all-languages ranking
    pub languages: Vec<Option<String>>,

    pub github_token: Option<String>,
    pub github_api_url: String,
    pub http_timeout: Duration,

    /// Raw window options, resolved against the clock by [`SyncConfig::sync_window`]
    pub sync_start: String,
    pub sync_end: String,
    pub sync_limit: i64,

    pub ranking_language: Option<String>,
    pub ranking_limit: u32,
    pub ranking_days: u32,
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `TRENDSYNC_DB_PATH` (default: trendsync.db)
    /// - `TRENDSYNC_SCHEMA_DIR` (default: sql)
    /// - `TRENDSYNC_LANGUAGES` (default: "", comma-separated; an empty entry means all languages)
    /// - `GITHUB_TOKEN` (optional)
    /// - `GITHUB_API_URL` (default: https://api.github.com)
    /// - `HTTP_TIMEOUT_SECS` (default: 10)
    /// - `SYNC_START`, `SYNC_END` (default: unbounded), `SYNC_LIMIT` (default: 0 = unbounded)
    /// - `RANKING_LANGUAGE` (optional), `RANKING_LIMIT` (default: 25), `RANKING_DAYS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`SyncConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str, default: &str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if value.trim().is_empty() => {
                    Err(ConfigError::MissingVariable(name.to_string()))
                }
                Some(value) => Ok(value.trim().to_string()),
                None => Ok(default.to_string()),
            }
        };

        let db_path = PathBuf::from(non_blank("TRENDSYNC_DB_PATH", "trendsync.db")?);
        let schema_dir = PathBuf::from(non_blank("TRENDSYNC_SCHEMA_DIR", "sql")?);
        let github_api_url = non_blank("GITHUB_API_URL", crate::github::DEFAULT_API_URL)?;

        let languages = parse_languages(&lookup("TRENDSYNC_LANGUAGES").unwrap_or_default());

        let github_token = lookup("GITHUB_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let http_timeout_secs: u64 = parse_number(&lookup, "HTTP_TIMEOUT_SECS", 10)?;
        if http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "HTTP_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            db_path,
            schema_dir,
            languages,
            github_token,
            github_api_url,
            http_timeout: Duration::from_secs(http_timeout_secs),
            sync_start: lookup("SYNC_START").unwrap_or_default(),
            sync_end: lookup("SYNC_END").unwrap_or_default(),
            sync_limit: parse_number(&lookup, "SYNC_LIMIT", 0)?,
            ranking_language: lookup("RANKING_LANGUAGE").and_then(|l| normalize_language(&l)),
            ranking_limit: parse_number(&lookup, "RANKING_LIMIT", 25)?,
            ranking_days: parse_number(&lookup, "RANKING_DAYS", 30)?,
        })
    }

    /// Resolve the sync window options against `now`
    pub fn sync_window(&self, now: NaiveDateTime) -> Result<SyncWindow, SyncError> {
        SyncWindow::from_options(&self.sync_start, &self.sync_end, self.sync_limit, now)
    }

    pub fn ranking_query(&self, now: NaiveDateTime) -> RankingQuery {
        RankingQuery::last_days(
            self.ranking_language.clone(),
            self.ranking_limit,
            self.ranking_days,
            now.date(),
        )
    }
}

/// Split a comma list of languages; blank entries (or a blank list) select all languages
fn parse_languages(raw: &str) -> Vec<Option<String>> {
    let mut languages: Vec<Option<String>> = Vec::new();

    for language in raw.split(',').map(normalize_language) {
        if !languages.contains(&language) {
            languages.push(language);
        }
    }

    languages
}

fn parse_number<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(value) if value.is_empty() => Ok(default),
        Some(value) => value.parse().map_err(|_| {
            ConfigError::InvalidValue(format!("{} must be a number, got '{}'", name, value))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<SyncConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config(&[]).unwrap();

        assert_eq!(config.db_path, PathBuf::from("trendsync.db"));
        assert_eq!(config.schema_dir, PathBuf::from("sql"));
        assert_eq!(config.languages, vec![None]);
        assert_eq!(config.github_token, None);
        assert_eq!(config.github_api_url, "https://api.github.com");
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.sync_limit, 0);
        assert_eq!(config.ranking_language, None);
        assert_eq!(config.ranking_limit, 25);
        assert_eq!(config.ranking_days, 30);
    }

    #[test]
    fn test_language_list() {
        let config = config(&[("TRENDSYNC_LANGUAGES", ",Rust, go ,rust")]).unwrap();
        assert_eq!(
            config.languages,
            vec![None, Some("rust".to_string()), Some("go".to_string())]
        );
    }

    #[test]
    fn test_invalid_number() {
        let result = config(&[("RANKING_LIMIT", "lots")]);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        let result = config(&[("HTTP_TIMEOUT_SECS", "0")]);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_blank_db_path_is_missing() {
        let result = config(&[("TRENDSYNC_DB_PATH", "  ")]);
        assert!(matches!(result, Err(ConfigError::MissingVariable(v)) if v == "TRENDSYNC_DB_PATH"));
    }

    #[test]
    fn test_blank_token_is_none() {
        let config = config(&[("GITHUB_TOKEN", "   ")]).unwrap();
        assert_eq!(config.github_token, None);
    }

    #[test]
    fn test_sync_window_resolution() {
        let config = config(&[
            ("SYNC_START", "2024-01-01 00:00:00"),
            ("SYNC_END", "-2d"),
            ("SYNC_LIMIT", "50"),
        ])
        .unwrap();

        let now = crate::window::parse_datetime("2024-01-10 12:00:00").unwrap();
        let window = config.sync_window(now).unwrap();

        assert_eq!(window.start, crate::window::parse_datetime("2024-01-01 00:00:00").ok());
        assert_eq!(window.end, crate::window::parse_datetime("2024-01-08 12:00:00").ok());
        assert_eq!(window.limit, Some(50));
    }

    #[test]
    fn test_negative_sync_limit_is_rejected_at_resolution() {
        let config = config(&[("SYNC_LIMIT", "-1")]).unwrap();
        let now = crate::window::parse_datetime("2024-01-10 12:00:00").unwrap();
        assert!(matches!(config.sync_window(now), Err(SyncError::Validation(_))));
    }
}
