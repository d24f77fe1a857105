//! Error taxonomy shared by the store, the resolver and the reconciliation engine
//!
//! Nothing in the library swallows these; binaries log and exit non-zero.

#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
    LockPoisoned,
    InvalidRow(String),
    Migration(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::LockPoisoned => write!(f, "Database connection lock poisoned"),
            StoreError::InvalidRow(msg) => write!(f, "Invalid row: {}", msg),
            StoreError::Migration(msg) => write!(f, "Schema migration failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors surfaced by a scrape or sync run
#[derive(Debug)]
pub enum SyncError {
    /// Malformed time expression
    Parse(String),
    /// Store read failure during slot or window fetch
    Lookup(StoreError),
    /// Store insert/update/delete failure
    Write(StoreError),
    /// Invalid option or inconsistent persisted state
    Validation(String),
    /// Snapshot or details source failure
    Source(String),
    Cancelled,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SyncError::Lookup(e) => write!(f, "Lookup failed: {}", e),
            SyncError::Write(e) => write!(f, "Write failed: {}", e),
            SyncError::Validation(msg) => write!(f, "Validation error: {}", msg),
            SyncError::Source(msg) => write!(f, "Source error: {}", msg),
            SyncError::Cancelled => write!(f, "Run cancelled"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Lookup(e) | SyncError::Write(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Source(err.to_string())
    }
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}
