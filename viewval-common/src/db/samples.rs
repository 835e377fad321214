//! Live-sample history
//!
//! The collector records one row per channel per round. The 30-day snapshot
//! is derived from these rows on read.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{format_timestamp, parse_timestamp};
use crate::models::ChannelStatsSnapshot;
use crate::time::window_start;
use crate::{ChannelId, Result};

pub const SNAPSHOT_WINDOW_DAYS: i64 = 30;

/// Record one live-status observation
///
/// `viewer_count = None` records the channel as offline.
pub async fn record_sample(
    pool: &SqlitePool,
    channel: &ChannelId,
    sampled_at: DateTime<Utc>,
    viewer_count: Option<u64>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO stream_samples (channel, sampled_at_utc, is_live, viewer_count)
         VALUES (?, ?, ?, ?)",
    )
    .bind(channel.as_str())
    .bind(format_timestamp(sampled_at))
    .bind(viewer_count.is_some())
    .bind(viewer_count.map(|v| v as i64))
    .execute(pool)
    .await?;

    Ok(())
}

/// 30-day statistics for a channel as of `now`
///
/// A channel with no samples yields the all-absent snapshot.
pub async fn read_snapshot(
    pool: &SqlitePool,
    channel: &ChannelId,
    now: DateTime<Utc>,
) -> Result<ChannelStatsSnapshot> {
    let since = format_timestamp(window_start(now, SNAPSHOT_WINDOW_DAYS));

    let (avg, peak, live_samples): (Option<f64>, Option<i64>, i64) = sqlx::query_as(
        r#"
        SELECT
            AVG(CASE WHEN is_live = 1 THEN viewer_count END),
            MAX(CASE WHEN is_live = 1 THEN viewer_count END),
            COALESCE(SUM(CASE WHEN is_live = 1 THEN 1 ELSE 0 END), 0)
        FROM stream_samples
        WHERE channel = ? AND sampled_at_utc >= ?
        "#,
    )
    .bind(channel.as_str())
    .bind(&since)
    .fetch_one(pool)
    .await?;

    let last_any: Option<String> =
        sqlx::query_scalar("SELECT MAX(sampled_at_utc) FROM stream_samples WHERE channel = ?")
            .bind(channel.as_str())
            .fetch_one(pool)
            .await?;

    Ok(ChannelStatsSnapshot {
        avg_viewers_30d: avg,
        peak_viewers_30d: peak,
        live_samples_30d: live_samples,
        last_any_sample_utc: last_any.as_deref().map(parse_timestamp).transpose()?,
    })
}

/// Delete samples older than `cutoff`, returning the number removed
pub async fn prune_samples_before(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM stream_samples WHERE sampled_at_utc < ?")
        .bind(format_timestamp(cutoff))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
