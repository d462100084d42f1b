mod repository;
mod unit_of_work;

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::domain::normalize_balance;

pub use repository::*;
pub use unit_of_work::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Connection tuning for the SQLite store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a writer waits for the database lock before failing.
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 5,
        }
    }
}

/// Timestamps are stored as fixed-width RFC 3339 strings so that text order
/// equals time order.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

/// Decimal text as stored in money columns, always with two fraction digits.
pub(crate) fn normalize_stored_amount(amount: Decimal) -> String {
    normalize_balance(amount).to_string()
}

/// True when the error (or anything it wraps) is a UNIQUE constraint failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_as_text() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(1500);

        let a = format_timestamp(earlier);
        let b = format_timestamp(later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(a, "2024-01-15T10:00:00.000000Z");
        assert_eq!(parse_timestamp(&b).unwrap(), later);
    }
}
