//! Live sample collector
//!
//! Every round re-reads the allow-list, probes all listed channels in one
//! batch and records one sample per channel (live with viewer count, or
//! offline). These samples feed the 30-day snapshot.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use viewval_common::allowlist::load_channel_list;
use viewval_common::db::{prune_samples_before, SNAPSHOT_WINDOW_DAYS};
use viewval_common::{time, Result};

use super::platform::StreamPlatform;
use super::sqlite_cache::SqliteStatsCache;

/// What one collection round did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub channels: usize,
    pub live: usize,
    pub offline: usize,
    /// Probe failed; nothing was recorded
    pub skipped: bool,
}

pub struct Collector<P> {
    cache: SqliteStatsCache,
    platform: P,
    channels_file: PathBuf,
    interval: Duration,
}

impl<P: StreamPlatform> Collector<P> {
    pub fn new(
        cache: SqliteStatsCache,
        platform: P,
        channels_file: PathBuf,
        interval: Duration,
    ) -> Self {
        Self {
            cache,
            platform,
            channels_file,
            interval,
        }
    }

    /// Run a single round
    ///
    /// A failed probe skips the round instead of recording every channel as
    /// offline.
    pub async fn collect_round(&self) -> Result<RoundSummary> {
        let channels = load_channel_list(&self.channels_file)?;
        if channels.is_empty() {
            debug!(path = %self.channels_file.display(), "No channels to collect");
            return Ok(RoundSummary::default());
        }

        let live = match self.platform.probe_live(&channels).await {
            Ok(live) => live,
            Err(e) => {
                warn!(error = %e, channels = channels.len(), "Live probe failed, skipping round");
                return Ok(RoundSummary {
                    channels: channels.len(),
                    skipped: true,
                    ..RoundSummary::default()
                });
            }
        };

        let mut summary = RoundSummary {
            channels: channels.len(),
            ..RoundSummary::default()
        };

        for channel in &channels {
            let viewer_count = live.get(channel).map(|stream| stream.viewer_count);
            self.cache.record_sample(channel, viewer_count).await?;
            if viewer_count.is_some() {
                summary.live += 1;
            } else {
                summary.offline += 1;
            }
        }

        let cutoff = time::window_start(time::now(), SNAPSHOT_WINDOW_DAYS);
        let pruned = prune_samples_before(self.cache.pool(), cutoff).await?;
        if pruned > 0 {
            debug!(pruned, "Pruned samples outside snapshot window");
        }

        info!(
            channels = summary.channels,
            live = summary.live,
            offline = summary.offline,
            "Collection round complete"
        );
        Ok(summary)
    }

    /// Collect until `shutdown` resolves
    ///
    /// Round errors are logged and the loop continues.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            path = %self.channels_file.display(),
            interval_secs = self.interval.as_secs(),
            "Collector started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Collector stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.collect_round().await {
                        warn!(error = %e, "Collection round failed");
                    }
                }
            }
        }
    }
}
