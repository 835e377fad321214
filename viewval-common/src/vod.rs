//! VOD batch aggregation
//!
//! Reduces the most recent broadcast records of a channel to the summary used
//! by projections: count, mean and median views, and views per recorded hour.

use serde::{Deserialize, Serialize};

use crate::duration::parse_duration_hours;

/// One past broadcast as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastRecord {
    pub view_count: u64,
    /// Elapsed-time token, e.g. `"3h8m33s"`
    pub duration: String,
}

impl BroadcastRecord {
    pub fn new(view_count: u64, duration: impl Into<String>) -> Self {
        Self {
            view_count,
            duration: duration.into(),
        }
    }
}

/// Aggregate over a VOD batch
///
/// `vod_count == 0` exactly when every rate is `None`. A `None`
/// `views_per_hour` on a non-empty batch means the batch carried no timing
/// data; it is never reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VodSummary {
    pub vod_count: usize,
    pub avg_views: Option<f64>,
    pub median_views: Option<f64>,
    pub views_per_hour: Option<f64>,
}

impl VodSummary {
    pub fn empty() -> Self {
        Self {
            vod_count: 0,
            avg_views: None,
            median_views: None,
            views_per_hour: None,
        }
    }

    /// Whether the summary is good enough to replace a cached one
    pub fn is_usable(&self) -> bool {
        self.vod_count > 0 && self.avg_views.is_some() && self.views_per_hour.is_some()
    }
}

impl Default for VodSummary {
    fn default() -> Self {
        Self::empty()
    }
}

/// Aggregate a batch of broadcast records
///
/// Pure and total: malformed durations count as zero hours.
pub fn summarize_broadcasts(records: &[BroadcastRecord]) -> VodSummary {
    if records.is_empty() {
        return VodSummary::empty();
    }

    let views: Vec<f64> = records.iter().map(|r| r.view_count as f64).collect();
    let total_views: f64 = views.iter().sum();
    let total_hours: f64 = records
        .iter()
        .map(|r| parse_duration_hours(&r.duration))
        .sum();

    let views_per_hour = if total_hours > 0.0 {
        Some(total_views / total_hours)
    } else {
        None
    };

    VodSummary {
        vod_count: records.len(),
        avg_views: Some(total_views / views.len() as f64),
        median_views: median(views),
        views_per_hour,
    }
}

/// Statistical median; mean of the two middle values for even counts
fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
