//! VOD summary cache
//!
//! At most one row per channel. Writes are upserts; only usable summaries
//! (non-empty, with average and rate) are ever stored, so a failed or empty
//! refresh can never replace a good row.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::{format_timestamp, parse_timestamp};
use crate::models::CachedVodSummary;
use crate::time::age_hours;
use crate::vod::VodSummary;
use crate::{ChannelId, Error, Result};

/// Read the cached summary for a channel
///
/// Returns `None` when no row exists or, if `max_age_hours` is given, when the
/// row is older than that.
pub async fn read_vod_summary(
    pool: &SqlitePool,
    channel: &ChannelId,
    max_age_hours: Option<f64>,
    now: DateTime<Utc>,
) -> Result<Option<CachedVodSummary>> {
    let row = sqlx::query(
        r#"
        SELECT vod_count, avg_vod_views, median_vod_views, views_per_hour, updated_at_utc
        FROM vod_summary
        WHERE channel = ?
        "#,
    )
    .bind(channel.as_str())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let updated_at: String = row.get("updated_at_utc");
    let updated_at_utc = parse_timestamp(&updated_at)?;

    if let Some(max_age) = max_age_hours {
        if age_hours(updated_at_utc, now) > max_age {
            tracing::debug!(channel = %channel, updated_at = %updated_at, "Cached VOD summary is stale");
            return Ok(None);
        }
    }

    let vod_count: i64 = row.get("vod_count");
    Ok(Some(CachedVodSummary {
        summary: VodSummary {
            vod_count: vod_count.max(0) as usize,
            avg_views: Some(row.get("avg_vod_views")),
            median_views: row.get("median_vod_views"),
            views_per_hour: Some(row.get("views_per_hour")),
        },
        updated_at_utc,
    }))
}

/// Upsert the summary for a channel
///
/// Rejects summaries that are not usable with `Error::InvalidInput`.
pub async fn write_vod_summary(
    pool: &SqlitePool,
    channel: &ChannelId,
    summary: &VodSummary,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    let (Some(avg_views), Some(views_per_hour)) = (summary.avg_views, summary.views_per_hour) else {
        return Err(Error::InvalidInput(format!(
            "refusing to cache incomplete VOD summary for {}",
            channel
        )));
    };
    if summary.vod_count == 0 {
        return Err(Error::InvalidInput(format!(
            "refusing to cache empty VOD summary for {}",
            channel
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO vod_summary (
            channel, vod_count, avg_vod_views, median_vod_views, views_per_hour, updated_at_utc
        ) VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(channel) DO UPDATE SET
            vod_count = excluded.vod_count,
            avg_vod_views = excluded.avg_vod_views,
            median_vod_views = excluded.median_vod_views,
            views_per_hour = excluded.views_per_hour,
            updated_at_utc = excluded.updated_at_utc
        "#,
    )
    .bind(channel.as_str())
    .bind(summary.vod_count as i64)
    .bind(avg_views)
    .bind(summary.median_views)
    .bind(views_per_hour)
    .bind(format_timestamp(updated_at))
    .execute(pool)
    .await?;

    tracing::debug!(channel = %channel, vod_count = summary.vod_count, "Cached VOD summary");
    Ok(())
}
