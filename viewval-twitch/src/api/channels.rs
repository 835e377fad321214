//! Channel endpoints
//!
//! Allow-list listing, projection inputs per channel and on-demand VOD
//! summary refresh.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use viewval_common::allowlist::load_channel_list;
use viewval_common::config::MAX_VOD_COUNT;
use viewval_common::models::{
    OverrideSet, ProjectionRequest, DEFAULT_CHURN_FACTOR, DEFAULT_PLANNED_HOURS,
};
use viewval_common::ChannelId;

use super::error::{ApiError, ApiResult};
use crate::services::{ChannelReport, RefreshOutcome};
use crate::AppState;

/// Allow-list response
#[derive(Debug, Serialize)]
pub struct ChannelListResponse {
    pub channels: Vec<ChannelId>,
    pub count: usize,
}

/// Query parameters for the inputs endpoint
#[derive(Debug, Default, Deserialize)]
pub struct InputsQuery {
    #[serde(default)]
    pub use_manual: bool,
    pub manual_avg: Option<f64>,
    pub manual_peak: Option<i64>,
    pub planned_hours: Option<f64>,
    pub churn_factor: Option<f64>,
}

impl InputsQuery {
    fn overrides(&self) -> OverrideSet {
        OverrideSet {
            use_manual: self.use_manual,
            manual_avg: self.manual_avg,
            manual_peak: self.manual_peak,
        }
    }
}

/// Resolved report plus the projection hand-off bundle
#[derive(Debug, Serialize)]
pub struct InputsResponse {
    #[serde(flatten)]
    pub report: ChannelReport,
    pub projection: ProjectionRequest,
}

/// Query parameters for the refresh endpoint
#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    pub vod_count: Option<usize>,
}

/// Refresh response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub channel: ChannelId,
    pub outcome: RefreshOutcome,
}

fn parse_channel(raw: &str) -> ApiResult<ChannelId> {
    ChannelId::new(raw).map_err(|_| ApiError::BadRequest(format!("Invalid channel: {:?}", raw)))
}

/// GET /api/channels
pub async fn list_channels(State(state): State<AppState>) -> ApiResult<Json<ChannelListResponse>> {
    let channels = load_channel_list(&state.channels_file)?;
    Ok(Json(ChannelListResponse {
        count: channels.len(),
        channels,
    }))
}

/// GET /api/channels/:channel/inputs
pub async fn get_channel_inputs(
    State(state): State<AppState>,
    channel: Result<Path<String>, PathRejection>,
    query: Result<Query<InputsQuery>, QueryRejection>,
) -> ApiResult<Json<InputsResponse>> {
    let Path(channel) = channel?;
    let Query(query) = query?;
    let channel = parse_channel(&channel)?;

    let report = state
        .orchestrator
        .resolve(&channel, &query.overrides(), None)
        .await?;

    let projection = ProjectionRequest::new(
        report.inputs.clone(),
        query.planned_hours.unwrap_or(DEFAULT_PLANNED_HOURS),
        query.churn_factor.unwrap_or(DEFAULT_CHURN_FACTOR),
    )?;

    Ok(Json(InputsResponse { report, projection }))
}

/// POST /api/channels/:channel/vod-summary/refresh
///
/// The outcome body is always returned; the status code reflects it.
pub async fn refresh_vod_summary(
    State(state): State<AppState>,
    channel: Result<Path<String>, PathRejection>,
    query: Result<Query<RefreshQuery>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<RefreshResponse>)> {
    let Path(channel) = channel?;
    let Query(query) = query?;
    let channel = parse_channel(&channel)?;

    let vod_count = query.vod_count.unwrap_or(state.default_vod_count);
    if vod_count == 0 || vod_count > MAX_VOD_COUNT {
        return Err(ApiError::BadRequest(format!(
            "vod_count must be between 1 and {}, got {}",
            MAX_VOD_COUNT, vod_count
        )));
    }

    let outcome = state
        .orchestrator
        .refresh_vod_summary(&channel, vod_count)
        .await?;

    let status = match &outcome {
        RefreshOutcome::Updated { .. } | RefreshOutcome::InsufficientData { .. } => StatusCode::OK,
        RefreshOutcome::ChannelNotFound => StatusCode::NOT_FOUND,
        RefreshOutcome::SourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
        RefreshOutcome::PlatformUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    };

    Ok((status, Json(RefreshResponse { channel, outcome })))
}

/// Build channel routes
pub fn channel_routes() -> Router<AppState> {
    Router::new()
        .route("/api/channels", get(list_channels))
        .route("/api/channels/:channel/inputs", get(get_channel_inputs))
        .route(
            "/api/channels/:channel/vod-summary/refresh",
            post(refresh_vod_summary),
        )
}
