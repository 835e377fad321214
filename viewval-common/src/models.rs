//! Viewer statistics models
//!
//! Records exchanged between the statistics cache, the stats orchestrator and
//! the projection engine. Optional fields distinguish "no data" from zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vod::VodSummary;
use crate::{Error, Result};

/// 30-day live-sample history for one channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatsSnapshot {
    /// Mean concurrent viewers over live samples
    pub avg_viewers_30d: Option<f64>,
    /// Highest concurrent viewer count seen live
    pub peak_viewers_30d: Option<i64>,
    /// Number of samples taken while the channel was live
    pub live_samples_30d: i64,
    /// Most recent sample of any kind (live or offline)
    pub last_any_sample_utc: Option<DateTime<Utc>>,
}

/// VOD summary as stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedVodSummary {
    #[serde(flatten)]
    pub summary: VodSummary,
    pub updated_at_utc: DateTime<Utc>,
}

/// User-supplied bootstrap values
///
/// When `use_manual` is set, the manual values replace the snapshot's
/// average and peak as a whole, including when a manual value is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideSet {
    #[serde(default)]
    pub use_manual: bool,
    #[serde(default)]
    pub manual_avg: Option<f64>,
    #[serde(default)]
    pub manual_peak: Option<i64>,
}

impl OverrideSet {
    pub fn manual(avg: Option<f64>, peak: Option<i64>) -> Self {
        Self {
            use_manual: true,
            manual_avg: avg,
            manual_peak: peak,
        }
    }

    /// Average and peak to feed downstream
    pub fn apply(&self, snapshot: &ChannelStatsSnapshot) -> (Option<f64>, Option<i64>) {
        if self.use_manual {
            (self.manual_avg, self.manual_peak)
        } else {
            (snapshot.avg_viewers_30d, snapshot.peak_viewers_30d)
        }
    }
}

/// Live state of a channel at query time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveStatus {
    Live,
    Offline,
    /// Probe unavailable or failed
    Unknown,
}

impl std::fmt::Display for LiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LiveStatus::Live => "LIVE",
            LiveStatus::Offline => "OFFLINE",
            LiveStatus::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Input bundle for the projection engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInputs {
    pub avg_viewers: Option<f64>,
    pub peak_viewers: Option<i64>,
    pub vod_views_per_hour: Option<f64>,
    pub live_status: LiveStatus,
    pub live_viewer_count: Option<u64>,
}

pub const DEFAULT_PLANNED_HOURS: f64 = 20.0;
pub const DEFAULT_CHURN_FACTOR: f64 = 2.5;
pub const MIN_CHURN_FACTOR: f64 = 0.5;

/// Hand-off to the external projection engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRequest {
    pub inputs: ResolvedInputs,
    /// Contracted streaming hours
    pub planned_hours: f64,
    /// Concurrent-to-unique viewer multiplier
    pub churn_factor: f64,
}

impl ProjectionRequest {
    pub fn new(inputs: ResolvedInputs, planned_hours: f64, churn_factor: f64) -> Result<Self> {
        if !planned_hours.is_finite() || planned_hours < 0.0 {
            return Err(Error::InvalidInput(format!(
                "planned_hours must be >= 0, got {}",
                planned_hours
            )));
        }
        if !churn_factor.is_finite() || churn_factor < MIN_CHURN_FACTOR {
            return Err(Error::InvalidInput(format!(
                "churn_factor must be >= {}, got {}",
                MIN_CHURN_FACTOR, churn_factor
            )));
        }
        Ok(Self {
            inputs,
            planned_hours,
            churn_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ChannelStatsSnapshot {
        ChannelStatsSnapshot {
            avg_viewers_30d: Some(1200.0),
            peak_viewers_30d: Some(5400),
            live_samples_30d: 320,
            last_any_sample_utc: None,
        }
    }

    fn inputs() -> ResolvedInputs {
        ResolvedInputs {
            avg_viewers: Some(100.0),
            peak_viewers: Some(250),
            vod_views_per_hour: None,
            live_status: LiveStatus::Unknown,
            live_viewer_count: None,
        }
    }

    #[test]
    fn test_snapshot_used_without_override() {
        let (avg, peak) = OverrideSet::default().apply(&snapshot());
        assert_eq!(avg, Some(1200.0));
        assert_eq!(peak, Some(5400));
    }

    #[test]
    fn test_manual_values_replace_snapshot() {
        let (avg, peak) = OverrideSet::manual(Some(80.0), Some(150)).apply(&snapshot());
        assert_eq!(avg, Some(80.0));
        assert_eq!(peak, Some(150));
    }

    #[test]
    fn test_manual_override_is_not_blended() {
        let (avg, peak) = OverrideSet::manual(Some(80.0), None).apply(&snapshot());
        assert_eq!(avg, Some(80.0));
        assert_eq!(peak, None);
    }

    #[test]
    fn test_live_status_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&LiveStatus::Offline).unwrap(), "\"OFFLINE\"");
        assert_eq!(LiveStatus::Live.to_string(), "LIVE");
    }

    #[test]
    fn test_projection_request_validation() {
        assert!(ProjectionRequest::new(inputs(), DEFAULT_PLANNED_HOURS, DEFAULT_CHURN_FACTOR).is_ok());
        assert!(ProjectionRequest::new(inputs(), 0.0, MIN_CHURN_FACTOR).is_ok());
        assert!(ProjectionRequest::new(inputs(), -1.0, 2.5).is_err());
        assert!(ProjectionRequest::new(inputs(), 10.0, 0.4).is_err());
        assert!(ProjectionRequest::new(inputs(), f64::NAN, 2.5).is_err());
    }
}
