//! SQLite implementation of [`StatsCache`]

use async_trait::async_trait;
use sqlx::SqlitePool;
use viewval_common::models::{CachedVodSummary, ChannelStatsSnapshot};
use viewval_common::{db, time, ChannelId, Result, VodSummary};

use super::platform::StatsCache;

/// Cache backed by the shared database pool
#[derive(Clone)]
pub struct SqliteStatsCache {
    pool: SqlitePool,
}

impl SqliteStatsCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Record a collector observation (`None` = offline)
    pub async fn record_sample(&self, channel: &ChannelId, viewer_count: Option<u64>) -> Result<()> {
        db::record_sample(&self.pool, channel, time::now(), viewer_count).await
    }
}

#[async_trait]
impl StatsCache for SqliteStatsCache {
    async fn read_snapshot(&self, channel: &ChannelId) -> Result<ChannelStatsSnapshot> {
        db::read_snapshot(&self.pool, channel, time::now()).await
    }

    async fn read_vod_summary(
        &self,
        channel: &ChannelId,
        max_age_hours: Option<f64>,
    ) -> Result<Option<CachedVodSummary>> {
        db::read_vod_summary(&self.pool, channel, max_age_hours, time::now()).await
    }

    async fn write_vod_summary(&self, channel: &ChannelId, summary: &VodSummary) -> Result<()> {
        db::write_vod_summary(&self.pool, channel, summary, time::now()).await
    }
}
