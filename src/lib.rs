//! trendsync - daily trending snapshots reconciled into rank slots
//!
//! - `trending` - snapshot sources, reconciliation engine, scrape handler
//! - `db` - store traits, SQLite store, schema migrations
//! - `github` - repository details client and incremental sync
//! - `query` - query composer and row-to-entity grouping
//! - `window` - `start`/`end`/`limit` sync window resolution
//! - `config` - environment configuration

pub mod config;
pub mod db;
pub mod error;
pub mod github;
pub mod model;
pub mod query;
pub mod trending;
pub mod window;

pub use error::{StoreError, SyncError};
