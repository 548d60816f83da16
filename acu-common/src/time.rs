//! Timestamp utilities
//!
//! Completion dates are stored as Unix timestamps (seconds, UTC).

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Get current UTC timestamp in seconds
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Render a stored timestamp for messages and reports
pub fn format_timestamp(timestamp: i64) -> String {
    match Utc.timestamp_opt(timestamp, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => timestamp.to_string(),
    }
}

/// Parse a completion date cell into a Unix timestamp
///
/// Accepted forms, tried in order:
/// 1. Bare integer (already a timestamp)
/// 2. RFC 3339 (`2024-03-01T09:30:00Z`)
/// 3. `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DD HH:MM` (UTC)
/// 4. `YYYY-MM-DD` / `DD/MM/YYYY` (midnight UTC)
pub fn parse_completion_date(value: &str) -> Result<i64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput("completion date is empty".to_string()));
    }

    if let Ok(timestamp) = value.parse::<i64>() {
        return Ok(timestamp);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc().timestamp());
        }
    }

    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc().timestamp());
            }
        }
    }

    Err(Error::InvalidInput(format!(
        "unrecognised completion date \"{}\"",
        value
    )))
}
