//! Snapshot sources
//!
//! A source yields one freshly produced, ordered list of item keys per call. The
//! position of a key in the list is its rank.

use crate::error::SyncError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

const GH_TREND_BASE_URL: &str = "https://github.com/trending";
const GH_TREND_LINK_SELECTOR: &str = ".Box-row .h3.lh-condensed a[href]";

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Category the source ranks (e.g. "repository")
    fn category(&self) -> &'static str;

    /// Fetch the current ranking for `language` (`None` for all languages)
    async fn fetch(&self, language: Option<&str>) -> Result<Vec<String>, SyncError>;
}

/// Scrapes the GitHub trending repositories page
pub struct GitHubTrendingSource {
    client: Client,
    base_url: String,
}

impl GitHubTrendingSource {
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        Self::with_base_url(GH_TREND_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trendsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn page_url(&self, language: Option<&str>) -> String {
        match language.map(str::trim).filter(|l| !l.is_empty()) {
            Some(language) => format!(
                "{}/{}?since=daily",
                self.base_url,
                urlencoding::encode(language)
            ),
            None => self.base_url.clone(),
        }
    }
}

#[async_trait]
impl SnapshotSource for GitHubTrendingSource {
    fn category(&self) -> &'static str {
        "repository"
    }

    async fn fetch(&self, language: Option<&str>) -> Result<Vec<String>, SyncError> {
        let url = self.page_url(language);
        log::debug!("🌐 Fetching trending page: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(SyncError::Source(format!(
                "GitHub trending page {} returned {}",
                url,
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_trending_page(&body)
    }
}

/// Extract `owner/name` keys from a trending page in page order
pub fn parse_trending_page(html: &str) -> Result<Vec<String>, SyncError> {
    let selector = Selector::parse(GH_TREND_LINK_SELECTOR)
        .map_err(|e| SyncError::Source(format!("invalid selector: {:?}", e)))?;

    let document = Html::parse_document(html);

    let keys = document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .map(|href| href.trim().trim_start_matches('/').to_string())
        .filter(|key| !key.is_empty())
        .collect();

    Ok(keys)
}
