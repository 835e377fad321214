//! Collaborator contracts consumed by the stats orchestrator
//!
//! The orchestrator never talks to Twitch or SQLite directly. It goes through
//! these traits so the platform handle and the cache handle are explicit
//! values owned by the caller.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use viewval_common::models::{CachedVodSummary, ChannelStatsSnapshot};
use viewval_common::{BroadcastRecord, ChannelId, Result, VodSummary};

/// Failure of a platform call
///
/// Every variant is recoverable from the orchestrator's point of view.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A channel that is currently broadcasting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStream {
    pub viewer_count: u64,
}

/// Streaming platform (live probe, user lookup, VOD listing)
#[async_trait]
pub trait StreamPlatform: Send + Sync {
    /// Live channels among `channels`; offline channels are absent
    async fn probe_live(
        &self,
        channels: &[ChannelId],
    ) -> std::result::Result<HashMap<ChannelId, LiveStream>, SourceError>;

    /// Platform user ids; unknown channels are absent
    async fn resolve_user_ids(
        &self,
        channels: &[ChannelId],
    ) -> std::result::Result<HashMap<ChannelId, String>, SourceError>;

    /// Most recent archived broadcasts, newest first, at most `limit`
    async fn fetch_recent_broadcasts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> std::result::Result<Vec<BroadcastRecord>, SourceError>;
}

/// Historical statistics cache
#[async_trait]
pub trait StatsCache: Send + Sync {
    async fn read_snapshot(&self, channel: &ChannelId) -> Result<ChannelStatsSnapshot>;

    /// `None` when missing or older than `max_age_hours`
    async fn read_vod_summary(
        &self,
        channel: &ChannelId,
        max_age_hours: Option<f64>,
    ) -> Result<Option<CachedVodSummary>>;

    /// Upsert; overwrites any prior row for the channel
    async fn write_vod_summary(&self, channel: &ChannelId, summary: &VodSummary) -> Result<()>;
}

#[async_trait]
impl<T: StreamPlatform + ?Sized> StreamPlatform for std::sync::Arc<T> {
    async fn probe_live(
        &self,
        channels: &[ChannelId],
    ) -> std::result::Result<HashMap<ChannelId, LiveStream>, SourceError> {
        (**self).probe_live(channels).await
    }

    async fn resolve_user_ids(
        &self,
        channels: &[ChannelId],
    ) -> std::result::Result<HashMap<ChannelId, String>, SourceError> {
        (**self).resolve_user_ids(channels).await
    }

    async fn fetch_recent_broadcasts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> std::result::Result<Vec<BroadcastRecord>, SourceError> {
        (**self).fetch_recent_broadcasts(user_id, limit).await
    }
}
