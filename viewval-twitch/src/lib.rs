//! viewval-twitch library
//!
//! Twitch-backed viewer statistics service: Helix client, live sample
//! collector, stats orchestrator and the JSON API in front of it.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod logging;
pub mod services;

use services::{SqliteStatsCache, StatsOrchestrator, StreamPlatform};

/// Platform handle shared by the orchestrator and the collector
pub type SharedPlatform = Arc<dyn StreamPlatform>;

/// Orchestrator as wired by the service
pub type Orchestrator = StatsOrchestrator<SqliteStatsCache, SharedPlatform>;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Allow-list file, re-read on every listing
    pub channels_file: PathBuf,
    /// VOD count used when a refresh request names none
    pub default_vod_count: usize,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, channels_file: PathBuf, default_vod_count: usize) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            channels_file,
            default_vod_count,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::channel_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
