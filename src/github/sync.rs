//! Repository detail sync
//!
//! - `sync_window` refreshes every stored repository whose `updated_at` falls in the
//!   resolved `(start, end]` window
//! - `register_missing` stores repositories first seen in a trending snapshot
//!
//! Both stop at the first failure; rows written before it stay written.

use super::RepositoryDetailsSource;
use crate::db::RepositoryStore;
use crate::error::SyncError;
use crate::window::SyncWindow;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Repositories selected by the window or the snapshot
    pub checked: usize,
    /// Rows written (updated for `sync_window`, inserted for `register_missing`)
    pub written: usize,
}

pub struct RepositorySync {
    store: Arc<dyn RepositoryStore>,
    source: Arc<dyn RepositoryDetailsSource>,

    /// Clock (for testing with fixed time)
    now_fn: Box<dyn Fn() -> NaiveDateTime + Send + Sync>,
}

impl RepositorySync {
    pub fn new(store: Arc<dyn RepositoryStore>, source: Arc<dyn RepositoryDetailsSource>) -> Self {
        Self::new_with_clock(store, source, Box::new(|| chrono::Local::now().naive_local()))
    }

    pub fn new_with_clock(
        store: Arc<dyn RepositoryStore>,
        source: Arc<dyn RepositoryDetailsSource>,
        now_fn: Box<dyn Fn() -> NaiveDateTime + Send + Sync>,
    ) -> Self {
        Self { store, source, now_fn }
    }

    /// Refresh the details of every repository in `window`, oldest id first
    pub async fn sync_window(
        &self,
        window: &SyncWindow,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let repositories = self.store.find_all(window).await.map_err(SyncError::Lookup)?;
        log::info!("🔄 {} repositories to sync in {}", repositories.len(), window);

        let mut report = SyncReport {
            checked: repositories.len(),
            written: 0,
        };

        for repository in repositories {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let details = self.source.fetch_repository(&repository.full_name).await?;

            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            self.store
                .update(repository.id, &details, (self.now_fn)())
                .await
                .map_err(SyncError::Write)?;

            log::debug!("   ├─ {} ⭐ {}", details.full_name, details.stars);
            report.written += 1;
        }

        Ok(report)
    }

    /// Fetch and store every name in `full_names` that has no repository row yet
    pub async fn register_missing(
        &self,
        full_names: &[String],
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let mut seen = HashSet::new();
        let names: Vec<String> = full_names
            .iter()
            .filter(|name| !name.is_empty() && seen.insert(name.as_str()))
            .cloned()
            .collect();

        let mut report = SyncReport {
            checked: names.len(),
            written: 0,
        };

        if names.is_empty() {
            return Ok(report);
        }

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let known: HashSet<String> = self
            .store
            .find_by_names(&names)
            .await
            .map_err(SyncError::Lookup)?
            .into_iter()
            .map(|repository| repository.full_name)
            .collect();

        for name in names.iter().filter(|name| !known.contains(*name)) {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let details = self.source.fetch_repository(name).await?;

            // Renamed repositories resolve to their canonical name, which may already be stored
            if details.full_name != *name
                && self
                    .store
                    .find_by_name(&details.full_name)
                    .await
                    .map_err(SyncError::Lookup)?
                    .is_some()
            {
                log::warn!("⚠️  {} resolves to known repository {}, skipping", name, details.full_name);
                continue;
            }

            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let id = self
                .store
                .save(&details, (self.now_fn)())
                .await
                .map_err(SyncError::Write)?;

            log::info!("➕ Registered {} (id {})", details.full_name, id);
            report.written += 1;
        }

        Ok(report)
    }
}
