//! GitHub REST API client
//!
//! Endpoint: `GET {api_base}/repos/{owner}/{name}`
//! Auth: optional `Authorization: Bearer <token>`; unauthenticated calls are rate limited.

use super::RepositoryDetailsSource;
use crate::error::SyncError;
use crate::model::{Owner, RepositoryDetails};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// `/repos/{full_name}` response (only the fields we persist)
#[derive(Debug, Clone, Deserialize)]
pub struct RepoResponse {
    pub id: i64,
    pub full_name: String,
    pub stargazers_count: i64,
    pub forks_count: i64,
    pub language: Option<String>,
    pub owner: OwnerResponse,
    pub description: Option<String>,
    pub default_branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerResponse {
    pub login: String,
    pub avatar_url: String,
}

impl From<RepoResponse> for RepositoryDetails {
    fn from(repo: RepoResponse) -> Self {
        Self {
            ghr_id: repo.id,
            full_name: repo.full_name,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            language: repo.language,
            owner: Owner {
                name: repo.owner.login,
                avatar_url: repo.owner.avatar_url,
            },
            description: repo.description,
            default_branch: repo.default_branch,
        }
    }
}

pub struct GitHubClient {
    client: Client,
    api_base: String,
}

impl GitHubClient {
    pub fn new(
        api_base: impl Into<String>,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| SyncError::Validation("GITHUB_TOKEN contains invalid characters".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trendsync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn repository_url(&self, full_name: &str) -> String {
        format!("{}/repos/{}", self.api_base, full_name.trim_matches('/'))
    }
}

#[async_trait]
impl RepositoryDetailsSource for GitHubClient {
    async fn fetch_repository(&self, full_name: &str) -> Result<RepositoryDetails, SyncError> {
        let url = self.repository_url(full_name);
        log::debug!("🌐 GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(SyncError::Source(format!(
                "GitHub API returned {} for {}",
                status, full_name
            )));
        }

        let repo: RepoResponse = response.json().await?;
        Ok(repo.into())
    }
}
