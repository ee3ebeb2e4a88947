//! Time bucketing utilities for ledger aggregation
//!
//! - Day buckets: "YYYY-MM-DD" (UTC) for check-ins and streaks
//! - Month buckets: "YYYY-MM" (UTC) for leaderboard periods

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Compute the day bucket string from a Unix timestamp in milliseconds.
pub fn day_bucket(timestamp_ms: i64) -> String {
    let dt = DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now);
    format!("{:04}-{:02}-{:02}", dt.year(), dt.month(), dt.day())
}

/// Compute the month bucket string from a Unix timestamp in milliseconds.
pub fn month_bucket(timestamp_ms: i64) -> String {
    let dt = DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now);
    month_key(dt.year(), dt.month())
}

/// Month bucket for an explicit year and month.
pub fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

/// Format a date as a day bucket.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a day bucket string back to a date.
pub fn parse_day_bucket(bucket: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(bucket, "%Y-%m-%d").ok()
}
