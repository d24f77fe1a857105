//! Scrape handler: source -> reconciler for each configured language
//!
//! Languages run one after another; the first failure ends the run.

use super::reconciler::{ReconcileReport, Reconciler};
use super::source::SnapshotSource;
use crate::error::SyncError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct ScrapeHandler {
    source: Arc<dyn SnapshotSource>,
    reconciler: Reconciler,
}

impl ScrapeHandler {
    pub fn new(source: Arc<dyn SnapshotSource>, reconciler: Reconciler) -> Self {
        Self { source, reconciler }
    }

    /// Fetch and reconcile one language; returns the snapshot alongside the report
    pub async fn scrape_language(
        &self,
        language: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<String>, ReconcileReport), SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let snapshot = self.source.fetch(language).await?;
        log::info!(
            "📥 Fetched {} {} entries for {}",
            snapshot.len(),
            self.source.category(),
            language.unwrap_or("all languages")
        );

        let report = self.reconciler.reconcile(&snapshot, language, cancel).await?;
        log::info!(
            "✅ Reconciled {} / {}: {} inserted, {} updated",
            report.trend_date,
            report.language.as_deref().unwrap_or("all"),
            report.inserted,
            report.updated
        );

        Ok((snapshot, report))
    }

    /// Scrape every language in order; `None` entries mean the all-languages ranking
    pub async fn scrape_all(
        &self,
        languages: &[Option<String>],
        cancel: &CancellationToken,
    ) -> Result<Vec<(Vec<String>, ReconcileReport)>, SyncError> {
        let mut results = Vec::with_capacity(languages.len());

        for language in languages {
            let result = self.scrape_language(language.as_deref(), cancel).await?;
            results.push(result);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqliteStore, TrendingStore, TRENDING_SELECT};
    use crate::query::QueryBuilder;
    use crate::window::parse_datetime;
    use async_trait::async_trait;

    struct FixedSource {
        keys: Vec<&'static str>,
    }

    #[async_trait]
    impl SnapshotSource for FixedSource {
        fn category(&self) -> &'static str {
            "repository"
        }

        async fn fetch(&self, _language: Option<&str>) -> Result<Vec<String>, SyncError> {
            Ok(self.keys.iter().map(|k| k.to_string()).collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SnapshotSource for FailingSource {
        fn category(&self) -> &'static str {
            "repository"
        }

        async fn fetch(&self, _language: Option<&str>) -> Result<Vec<String>, SyncError> {
            Err(SyncError::Source("offline".to_string()))
        }
    }

    fn handler(source: Arc<dyn SnapshotSource>, store: Arc<SqliteStore>) -> ScrapeHandler {
        let reconciler = Reconciler::new_with_clock(
            store,
            Box::new(|| parse_datetime("2024-01-10 08:00:00").unwrap()),
        );
        ScrapeHandler::new(source, reconciler)
    }

    #[tokio::test]
    async fn test_scrape_all_languages() {
        let store = Arc::new(
            SqliteStore::open_in_memory(concat!(env!("CARGO_MANIFEST_DIR"), "/sql")).unwrap(),
        );
        let source = Arc::new(FixedSource { keys: vec!["a/b", "c/d"] });
        let handler = handler(source, store.clone());

        let languages = vec![None, Some("rust".to_string())];
        let results = handler.scrape_all(&languages, &CancellationToken::new()).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.inserted, 2);
        assert_eq!(results[1].1.language.as_deref(), Some("rust"));

        let rows = store
            .select_trending(&QueryBuilder::new(TRENDING_SELECT).render())
            .await
            .unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let store = Arc::new(
            SqliteStore::open_in_memory(concat!(env!("CARGO_MANIFEST_DIR"), "/sql")).unwrap(),
        );
        let handler = handler(Arc::new(FailingSource), store);

        let result = handler.scrape_language(Some("go"), &CancellationToken::new()).await;
        assert!(matches!(result, Err(SyncError::Source(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let store = Arc::new(
            SqliteStore::open_in_memory(concat!(env!("CARGO_MANIFEST_DIR"), "/sql")).unwrap(),
        );
        let handler = handler(Arc::new(FailingSource), store);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = handler.scrape_all(&[None], &cancel).await;
        assert!(matches!(result, Err(SyncError::Cancelled)));
    }
}
