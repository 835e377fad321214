//! SQLite statistics cache
//!
//! Holds the collector's live samples (source of the 30-day snapshot) and
//! the per-channel VOD summary cache.

pub mod init;
pub mod samples;
pub mod vod_cache;

pub use init::*;
pub use samples::*;
pub use vod_cache::*;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Timestamps are stored as second-precision RFC 3339 UTC (`...Z`) so that
/// text comparison matches chronological order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}
