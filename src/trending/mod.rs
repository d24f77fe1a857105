//! Trending snapshot ingestion
//!
//! - `source` - snapshot sources (GitHub trending page)
//! - `reconciler` - rank-slot reconciliation engine
//! - `scrape` - runs source -> reconciler per language

pub mod reconciler;
pub mod scrape;
pub mod source;

pub use reconciler::{ReconcileReport, Reconciler};
pub use scrape::ScrapeHandler;
pub use source::{parse_trending_page, GitHubTrendingSource, SnapshotSource};
