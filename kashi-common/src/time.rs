//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current epoch time in milliseconds
///
/// Used as the version stamp on freshly resolved documents and for TTL
/// arithmetic against `stored_at_ms`.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}
