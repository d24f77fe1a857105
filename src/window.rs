//! Sync window resolution
//!
//! Turns the `start` / `end` / `limit` options of an incremental sync into absolute
//! bounds over a record's `updated_at`, i.e. the half-open interval `(start, end]`.
//!
//! `end` accepts an absolute `YYYY-MM-DD HH:MM:SS`, a relative `<signed-int>d` or
//! `<signed-int>h` offset from now, or an empty string for "unbounded".

use crate::error::SyncError;
use chrono::{NaiveDateTime, TimeDelta};

/// Canonical timestamp pattern used for every stored or compared datetime
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical date pattern for trend dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, SyncError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|e| {
        SyncError::Parse(format!(
            "'{}' is not a valid datetime (expected YYYY-MM-DD HH:MM:SS): {}",
            value, e
        ))
    })
}

/// Resolve an `end` expression against `now`
///
/// Returns `Ok(None)` for an empty expression. A `d`/`h` suffix whose remainder is not
/// a signed integer is parsed as an absolute datetime instead.
pub fn resolve_end(expression: &str, now: NaiveDateTime) -> Result<Option<NaiveDateTime>, SyncError> {
    let expression = expression.trim();

    if expression.is_empty() {
        return Ok(None);
    }

    if let Some(offset) = relative_offset(expression)? {
        return now
            .checked_add_signed(offset)
            .map(Some)
            .ok_or_else(|| SyncError::Parse(format!("'{}' is out of range", expression)));
    }

    parse_datetime(expression).map(Some)
}

fn relative_offset(expression: &str) -> Result<Option<TimeDelta>, SyncError> {
    let (number, unit) = if let Some(n) = expression.strip_suffix('d') {
        (n, 'd')
    } else if let Some(n) = expression.strip_suffix('h') {
        (n, 'h')
    } else {
        return Ok(None);
    };

    let Ok(n) = number.parse::<i64>() else {
        return Ok(None);
    };

    let delta = match unit {
        'd' => TimeDelta::try_days(n),
        _ => TimeDelta::try_hours(n),
    };

    delta
        .map(Some)
        .ok_or_else(|| SyncError::Parse(format!("'{}' is out of range", expression)))
}

/// Validate a `start` option; empty means unbounded
pub fn parse_start(expression: &str) -> Result<Option<NaiveDateTime>, SyncError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Ok(None);
    }
    parse_datetime(expression).map(Some)
}

/// Resolved bounds for one incremental sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub limit: Option<u32>,
}

impl SyncWindow {
    /// Build a window from raw options
    ///
    /// A limit of 0 means unbounded; a negative limit is rejected.
    pub fn from_options(
        start: &str,
        end: &str,
        limit: i64,
        now: NaiveDateTime,
    ) -> Result<Self, SyncError> {
        let start = parse_start(start)?;
        let end = resolve_end(end, now)?;

        let limit = match limit {
            n if n < 0 => {
                return Err(SyncError::Validation(format!(
                    "limit must be non-negative, got {}",
                    n
                )))
            }
            0 => None,
            n => Some(u32::try_from(n).map_err(|_| {
                SyncError::Validation(format!("limit {} is too large", n))
            })?),
        };

        Ok(Self { start, end, limit })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.limit.is_none()
    }
}

impl std::fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_bound = |b: &Option<NaiveDateTime>| match b {
            Some(dt) => format_datetime(dt),
            None => "-".to_string(),
        };
        write!(
            f,
            "({}, {}] limit={}",
            fmt_bound(&self.start),
            fmt_bound(&self.end),
            self.limit.map(|l| l.to_string()).unwrap_or_else(|| "none".to_string())
        )
    }
}
