//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Start of the rolling history window ending at `now`
pub fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

/// Age of `timestamp` relative to `now`, in fractional hours
///
/// Timestamps in the future have age zero.
pub fn age_hours(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - timestamp).num_seconds().max(0);
    seconds as f64 / 3600.0
}
