//! Per-channel input resolution
//!
//! Merges manual overrides, the 30-day sample snapshot, the live probe and the
//! cached VOD rate into one [`ResolvedInputs`] bundle. VOD refresh happens only
//! when the caller asks for it.
//!
//! Platform failures never leave this module as errors: the live probe
//! degrades to [`LiveStatus::Unknown`] and a refresh reports a
//! [`RefreshOutcome`]. Cache failures do propagate, since nothing can be
//! resolved without storage.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use viewval_common::models::{
    CachedVodSummary, ChannelStatsSnapshot, LiveStatus, OverrideSet, ResolvedInputs,
};
use viewval_common::{summarize_broadcasts, ChannelId, Result, VodSummary};

use super::platform::{StatsCache, StreamPlatform};

/// Result of an explicit VOD refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Summary written to the cache
    Updated { summary: VodSummary },
    /// Platform has no such channel; cache untouched
    ChannelNotFound,
    /// Aggregate unusable; cache untouched
    InsufficientData { summary: VodSummary },
    /// Platform call failed; cache untouched
    SourceUnavailable { reason: String },
    /// No platform credentials configured
    PlatformUnavailable,
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated { .. })
    }
}

/// Everything resolved for one channel in one interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel: ChannelId,
    pub snapshot: ChannelStatsSnapshot,
    /// Cached VOD summary backing `inputs.vod_views_per_hour`
    pub vod_summary: Option<CachedVodSummary>,
    pub inputs: ResolvedInputs,
    /// Present only when a refresh was requested
    pub refresh: Option<RefreshOutcome>,
}

/// Stats orchestrator
///
/// Owns its cache handle and an optional platform handle. Without a platform
/// the orchestrator still answers from the cache.
pub struct StatsOrchestrator<C, P> {
    cache: C,
    platform: Option<P>,
    vod_max_age_hours: f64,
}

impl<C, P> StatsOrchestrator<C, P>
where
    C: StatsCache,
    P: StreamPlatform,
{
    pub fn new(cache: C, platform: Option<P>, vod_max_age_hours: f64) -> Self {
        Self {
            cache,
            platform,
            vod_max_age_hours,
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn has_platform(&self) -> bool {
        self.platform.is_some()
    }

    pub fn vod_max_age_hours(&self) -> f64 {
        self.vod_max_age_hours
    }

    /// Live state and viewer count; never fails
    pub async fn resolve_live_status(&self, channel: &ChannelId) -> (LiveStatus, Option<u64>) {
        let Some(platform) = &self.platform else {
            return (LiveStatus::Unknown, None);
        };

        match platform.probe_live(std::slice::from_ref(channel)).await {
            Ok(live) => match live.get(channel) {
                Some(stream) => (LiveStatus::Live, Some(stream.viewer_count)),
                None => (LiveStatus::Offline, None),
            },
            Err(e) => {
                warn!(channel = %channel, error = %e, "Live probe failed, status unknown");
                (LiveStatus::Unknown, None)
            }
        }
    }

    /// Fetch recent broadcasts and store their summary when usable
    ///
    /// `limit` is expected to be bounded by the caller (1..=100 for Helix).
    pub async fn refresh_vod_summary(
        &self,
        channel: &ChannelId,
        limit: usize,
    ) -> Result<RefreshOutcome> {
        let Some(platform) = &self.platform else {
            warn!(channel = %channel, "VOD refresh requested without platform credentials");
            return Ok(RefreshOutcome::PlatformUnavailable);
        };

        let user_ids = match platform.resolve_user_ids(std::slice::from_ref(channel)).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(channel = %channel, error = %e, "User lookup failed");
                return Ok(RefreshOutcome::SourceUnavailable {
                    reason: e.to_string(),
                });
            }
        };

        let Some(user_id) = user_ids.get(channel) else {
            info!(channel = %channel, "Channel not found on platform");
            return Ok(RefreshOutcome::ChannelNotFound);
        };

        let records = match platform.fetch_recent_broadcasts(user_id, limit).await {
            Ok(records) => records,
            Err(e) => {
                warn!(channel = %channel, error = %e, "VOD fetch failed");
                return Ok(RefreshOutcome::SourceUnavailable {
                    reason: e.to_string(),
                });
            }
        };

        let summary = summarize_broadcasts(&records);
        if !summary.is_usable() {
            info!(
                channel = %channel,
                vod_count = summary.vod_count,
                "VOD summary insufficient, cache left unchanged"
            );
            return Ok(RefreshOutcome::InsufficientData { summary });
        }

        self.cache.write_vod_summary(channel, &summary).await?;
        info!(
            channel = %channel,
            vod_count = summary.vod_count,
            views_per_hour = ?summary.views_per_hour,
            "VOD summary updated"
        );

        Ok(RefreshOutcome::Updated { summary })
    }

    /// Resolve the projection inputs for one channel
    ///
    /// With `refresh = Some(limit)` a VOD refresh runs first; after a
    /// successful one the cache is re-read without an age bound.
    pub async fn resolve(
        &self,
        channel: &ChannelId,
        overrides: &OverrideSet,
        refresh: Option<usize>,
    ) -> Result<ChannelReport> {
        let (live_status, live_viewer_count) = self.resolve_live_status(channel).await;

        let snapshot = self.cache.read_snapshot(channel).await?;
        let mut vod_summary = self
            .cache
            .read_vod_summary(channel, Some(self.vod_max_age_hours))
            .await?;

        let refresh = match refresh {
            Some(limit) => {
                let outcome = self.refresh_vod_summary(channel, limit).await?;
                if outcome.is_updated() {
                    vod_summary = self.cache.read_vod_summary(channel, None).await?;
                }
                Some(outcome)
            }
            None => None,
        };

        let (avg_viewers, peak_viewers) = overrides.apply(&snapshot);
        let inputs = ResolvedInputs {
            avg_viewers,
            peak_viewers,
            vod_views_per_hour: vod_summary
                .as_ref()
                .and_then(|cached| cached.summary.views_per_hour),
            live_status,
            live_viewer_count,
        };

        debug!(
            channel = %channel,
            live_status = %inputs.live_status,
            use_manual = overrides.use_manual,
            "Resolved channel inputs"
        );

        Ok(ChannelReport {
            channel: channel.clone(),
            snapshot,
            vod_summary,
            inputs,
            refresh,
        })
    }
}
