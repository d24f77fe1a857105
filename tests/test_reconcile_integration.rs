//! End-to-end reconciliation against an on-disk SQLite store
//!
//! Run with: cargo test --test test_reconcile_integration

use chrono::NaiveDateTime;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use trendsync::db::{RankingQuery, RepositoryStore, SqliteStore, TrendingStore, TRENDING_SELECT};
use trendsync::model::{Owner, RepositoryDetails, TrendingRecord};
use trendsync::query::{Direction, QueryArg, QueryBuilder};
use trendsync::trending::Reconciler;
use trendsync::window::parse_datetime;

const SCHEMA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/sql");

fn ts(s: &str) -> NaiveDateTime {
    parse_datetime(s).unwrap()
}

fn snapshot(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

async fn slots(store: &SqliteStore, language: Option<&str>) -> Vec<TrendingRecord> {
    let mut qb = QueryBuilder::new(TRENDING_SELECT);
    match language {
        Some(language) => qb.filter("language = ?", [QueryArg::from(language)]),
        None => qb.filter("language IS NULL", []),
    };
    qb.order_by("rank", Direction::Asc);

    store.select_trending(&qb.render()).await.unwrap()
}

#[tokio::test]
async fn test_second_run_overwrites_slots_by_rank() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp_file.path(), SCHEMA_DIR).unwrap());
    let reconciler = Reconciler::new(store.clone());
    let cancel = CancellationToken::new();

    let first = reconciler
        .reconcile_at(&snapshot(&["a/b", "c/d"]), None, ts("2024-01-10 08:00:00"), &cancel)
        .await
        .unwrap();
    assert_eq!((first.inserted, first.updated), (2, 0));

    let second = reconciler
        .reconcile_at(&snapshot(&["x/y", "c/d"]), None, ts("2024-01-10 09:30:00"), &cancel)
        .await
        .unwrap();
    assert_eq!((second.inserted, second.updated), (0, 2));

    let rows = slots(&store, None).await;
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].rank, rows[0].item_key.as_str()), (1, "x/y"));
    assert_eq!((rows[1].rank, rows[1].item_key.as_str()), (2, "c/d"));
    assert!(rows.iter().all(|r| r.scraped_at == ts("2024-01-10 09:30:00")));
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp_file.path(), SCHEMA_DIR).unwrap());
    let reconciler = Reconciler::new(store.clone());
    let cancel = CancellationToken::new();
    let keys = snapshot(&["a/b", "c/d", "e/f"]);
    let now = ts("2024-01-10 08:00:00");

    reconciler.reconcile_at(&keys, Some("rust"), now, &cancel).await.unwrap();
    let before = slots(&store, Some("rust")).await;

    reconciler.reconcile_at(&keys, Some("rust"), now, &cancel).await.unwrap();
    let after = slots(&store, Some("rust")).await;

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_one_slot_per_rank_across_runs_and_days() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp_file.path(), SCHEMA_DIR).unwrap());
    let reconciler = Reconciler::new(store.clone());
    let cancel = CancellationToken::new();

    reconciler
        .reconcile_at(&snapshot(&["a/b", "c/d"]), Some("go"), ts("2024-01-10 08:00:00"), &cancel)
        .await
        .unwrap();
    reconciler
        .reconcile_at(&snapshot(&["c/d", "a/b", "e/f"]), Some("go"), ts("2024-01-10 20:00:00"), &cancel)
        .await
        .unwrap();
    reconciler
        .reconcile_at(&snapshot(&["a/b"]), Some("go"), ts("2024-01-11 08:00:00"), &cancel)
        .await
        .unwrap();

    let rows = slots(&store, Some("go")).await;
    assert_eq!(rows.len(), 4);

    let mut keys: Vec<_> = rows.iter().map(|r| (r.trend_date.to_string(), r.rank)).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 4);
}

#[tokio::test]
async fn test_ranking_over_reconciled_slots() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp_file.path(), SCHEMA_DIR).unwrap());
    let reconciler = Reconciler::new(store.clone());
    let cancel = CancellationToken::new();

    for name in ["a/b", "c/d"] {
        let details = RepositoryDetails {
            full_name: name.to_string(),
            owner: Owner {
                name: name.split('/').next().unwrap().to_string(),
                avatar_url: String::new(),
            },
            default_branch: "main".to_string(),
            ..Default::default()
        };
        store.save(&details, ts("2024-01-01 00:00:00")).await.unwrap();
    }

    reconciler
        .reconcile_at(&snapshot(&["c/d", "a/b"]), None, ts("2024-01-09 08:00:00"), &cancel)
        .await
        .unwrap();
    reconciler
        .reconcile_at(&snapshot(&["a/b", "c/d"]), None, ts("2024-01-10 08:00:00"), &cancel)
        .await
        .unwrap();
    reconciler
        .reconcile_at(&snapshot(&["a/b"]), Some("rust"), ts("2024-01-10 08:00:00"), &cancel)
        .await
        .unwrap();

    let today = ts("2024-01-10 12:00:00").date();
    let ranking = store
        .find_trending(&RankingQuery::last_days(None, 10, 30, today))
        .await
        .unwrap();

    // Both featured twice with best rank 1; ties fall back to the lower id
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].repository.full_name, "a/b");
    assert_eq!((ranking[0].featured_count, ranking[0].best_ranking), (2, 1));
    assert_eq!(ranking[1].repository.full_name, "c/d");
    assert_eq!((ranking[1].featured_count, ranking[1].best_ranking), (2, 1));
}
