//! GitHub repository details
//!
//! `RepositoryDetailsSource` is the seam between the sync handler and the REST API;
//! tests swap in canned sources.

pub mod client;
pub mod sync;

use crate::error::SyncError;
use crate::model::RepositoryDetails;
use async_trait::async_trait;

pub use client::{GitHubClient, DEFAULT_API_URL};
pub use sync::{RepositorySync, SyncReport};

#[async_trait]
pub trait RepositoryDetailsSource: Send + Sync {
    /// Current details of `full_name` (`owner/name`)
    async fn fetch_repository(&self, full_name: &str) -> Result<RepositoryDetails, SyncError>;
}
