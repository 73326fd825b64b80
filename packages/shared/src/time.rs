//! Wall-clock helpers.
//!
//! Deadlines inside the coordinator use the monotonic tokio clock; these
//! helpers only produce the timestamps shown to users.

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current Unix timestamp in UTC (milliseconds)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render a Unix timestamp in milliseconds as RFC 3339 (UTC, millisecond precision).
///
/// Out-of-range values render as an empty string.
pub fn timestamp_to_rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
