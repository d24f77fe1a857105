//! Rank-slot reconciliation
//!
//! Turns an ordered snapshot of item keys into create/update operations against the
//! persisted rank slots of `(trend_date, language)`:
//!
//! ```text
//! snapshot[i]  ->  rank i + 1
//!     ↓
//! slot occupied?  yes -> overwrite item_key, bump scraped_at / trend_date, update
//!                 no  -> insert new slot
//! ```
//!
//! Rank is the only join key. An item that moves from rank 3 to rank 1 between runs is
//! two independent slot overwrites, not a move.

use crate::db::{TrendingStore, TRENDING_SELECT};
use crate::error::SyncError;
use crate::model::{normalize_language, TrendingRecord};
use crate::query::{Direction, QueryArg, QueryBuilder};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub trend_date: NaiveDate,
    pub language: Option<String>,
    pub inserted: usize,
    pub updated: usize,
}

impl ReconcileReport {
    fn empty(trend_date: NaiveDate, language: Option<String>) -> Self {
        Self {
            trend_date,
            language,
            inserted: 0,
            updated: 0,
        }
    }
}

/// Reconciliation engine
///
/// Owns every write to the trending table. Runs that target the same
/// `(trend_date, language)` must be serialized by the caller.
pub struct Reconciler {
    store: Arc<dyn TrendingStore>,

    /// Clock (for testing with fixed time)
    now_fn: Box<dyn Fn() -> NaiveDateTime + Send + Sync>,
}

impl Reconciler {
    /// Create a reconciler using local wall-clock time
    pub fn new(store: Arc<dyn TrendingStore>) -> Self {
        Self::new_with_clock(store, Box::new(|| chrono::Local::now().naive_local()))
    }

    pub fn new_with_clock(
        store: Arc<dyn TrendingStore>,
        now_fn: Box<dyn Fn() -> NaiveDateTime + Send + Sync>,
    ) -> Self {
        Self { store, now_fn }
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.now_fn)()
    }

    pub async fn reconcile(
        &self,
        snapshot: &[String],
        language: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, SyncError> {
        self.reconcile_at(snapshot, language, self.now(), cancel).await
    }

    /// Reconcile `snapshot` into the slots of `(now.date(), language)`
    ///
    /// `language` is trimmed and lowercased; blank means the all-languages ranking.
    ///
    /// Fail-fast: the first store error stops the remaining ranks. Writes already
    /// applied stay; each one is idempotent, so the next run converges.
    pub async fn reconcile_at(
        &self,
        snapshot: &[String],
        language: Option<&str>,
        now: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, SyncError> {
        let trend_date = now.date();
        let language = language.and_then(normalize_language);
        let mut report = ReconcileReport::empty(trend_date, language.clone());

        if snapshot.is_empty() {
            log::debug!("Empty snapshot for {:?}, nothing to reconcile", language);
            return Ok(report);
        }

        let mut slots = self.fetch_slots(trend_date, language.as_deref(), cancel).await?;

        for (index, item_key) in snapshot.iter().enumerate() {
            let rank = u32::try_from(index + 1)
                .map_err(|_| SyncError::Validation(format!("rank {} out of range", index + 1)))?;

            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            match slots.remove(&rank) {
                Some(mut record) => {
                    record.item_key = item_key.clone();
                    record.scraped_at = now;
                    record.trend_date = trend_date;

                    self.store
                        .update_trending(&record)
                        .await
                        .map_err(SyncError::Write)?;
                    report.updated += 1;
                }
                None => {
                    let record = TrendingRecord::new(rank, item_key.clone(), language.clone(), now);

                    self.store
                        .insert_trending(&record)
                        .await
                        .map_err(SyncError::Write)?;
                    report.inserted += 1;
                }
            }
        }

        Ok(report)
    }

    /// Current slots for `(trend_date, language)` keyed by rank
    async fn fetch_slots(
        &self,
        trend_date: NaiveDate,
        language: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<HashMap<u32, TrendingRecord>, SyncError> {
        let mut qb = QueryBuilder::new(TRENDING_SELECT);
        qb.filter(
            "trend_date = ?",
            [QueryArg::from(trend_date.format(crate::window::DATE_FORMAT).to_string())],
        );

        match language {
            Some(language) => {
                qb.filter("language = ?", [QueryArg::from(language)]);
            }
            None => {
                qb.filter("language IS NULL", []);
            }
        }

        qb.order_by("rank", Direction::Asc);

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let records = self
            .store
            .select_trending(&qb.render())
            .await
            .map_err(SyncError::Lookup)?;

        let mut slots = HashMap::with_capacity(records.len());
        for record in records {
            let rank = record.rank;
            if slots.insert(rank, record).is_some() {
                return Err(SyncError::Validation(format!(
                    "duplicate rank {} for {} / {:?}",
                    rank, trend_date, language
                )));
            }
        }

        Ok(slots)
    }
}
