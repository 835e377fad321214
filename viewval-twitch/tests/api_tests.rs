//! Integration tests for the viewval HTTP API
//!
//! Tests cover:
//! - Health endpoint
//! - Allow-list listing
//! - Projection inputs with overrides and validation
//! - VOD summary refresh status mapping

mod helpers;

use std::io::Write;
use std::path::PathBuf;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::{memory_cache, FakePlatform};
use serde_json::Value;
use tempfile::NamedTempFile;
use tower::util::ServiceExt; // for `oneshot` method
use viewval_common::BroadcastRecord;
use viewval_twitch::services::StatsOrchestrator;
use viewval_twitch::{build_router, AppState, SharedPlatform};

/// Test helper: app with an optional platform and allow-list path
async fn setup_app(platform: Option<SharedPlatform>, channels_file: PathBuf) -> axum::Router {
    let orchestrator = StatsOrchestrator::new(memory_cache().await, platform, 12.0);
    build_router(AppState::new(orchestrator, channels_file, 20))
}

async fn setup_default_app() -> axum::Router {
    setup_app(None, PathBuf::from("/nonexistent/streamers.txt")).await
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_default_app().await;

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "viewval");
    assert!(body["version"].is_string());
    assert_eq!(body["platform_configured"], false);
}

// =============================================================================
// Allow-list
// =============================================================================

#[tokio::test]
async fn test_list_channels() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# tier 1\nShroud\nxqc\n\nshroud").unwrap();
    let app = setup_app(None, file.path().to_path_buf()).await;

    let response = app.oneshot(test_request("GET", "/api/channels")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["channels"], serde_json::json!(["shroud", "xqc"]));
}

#[tokio::test]
async fn test_list_channels_missing_file() {
    let app = setup_default_app().await;

    let response = app.oneshot(test_request("GET", "/api/channels")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 0);
}

// =============================================================================
// Inputs
// =============================================================================

#[tokio::test]
async fn test_inputs_without_data() {
    let app = setup_default_app().await;

    let response = app
        .oneshot(test_request("GET", "/api/channels/Shroud/inputs"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["channel"], "shroud");
    assert_eq!(body["inputs"]["live_status"], "UNKNOWN");
    assert!(body["inputs"]["avg_viewers"].is_null());
    assert!(body["inputs"]["vod_views_per_hour"].is_null());
    assert_eq!(body["projection"]["planned_hours"], 20.0);
    assert_eq!(body["projection"]["churn_factor"], 2.5);
}

#[tokio::test]
async fn test_inputs_with_manual_override() {
    let app = setup_default_app().await;

    let uri = "/api/channels/shroud/inputs?use_manual=true&manual_avg=750&manual_peak=1200&planned_hours=8";
    let response = app.oneshot(test_request("GET", uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["inputs"]["avg_viewers"], 750.0);
    assert_eq!(body["inputs"]["peak_viewers"], 1200);
    assert_eq!(body["projection"]["planned_hours"], 8.0);
}

#[tokio::test]
async fn test_inputs_rejects_low_churn_factor() {
    let app = setup_default_app().await;

    let response = app
        .oneshot(test_request("GET", "/api/channels/shroud/inputs?churn_factor=0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_inputs_rejects_blank_channel() {
    let app = setup_default_app().await;

    let response = app
        .oneshot(test_request("GET", "/api/channels/%20%20/inputs"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inputs_malformed_query_is_json_error() {
    let app = setup_default_app().await;

    let response = app
        .oneshot(test_request("GET", "/api/channels/shroud/inputs?manual_avg=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_rejects_out_of_range_vod_count() {
    for count in ["0", "101"] {
        let app = setup_default_app().await;
        let uri = format!("/api/channels/shroud/vod-summary/refresh?vod_count={}", count);

        let response = app.oneshot(test_request("POST", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "vod_count={}", count);
    }
}

#[tokio::test]
async fn test_refresh_negative_vod_count_is_json_error() {
    let app = setup_default_app().await;

    let response = app
        .oneshot(test_request(
            "POST",
            "/api/channels/shroud/vod-summary/refresh?vod_count=-1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_refresh_without_platform() {
    let app = setup_default_app().await;

    let response = app
        .oneshot(test_request("POST", "/api/channels/shroud/vod-summary/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"]["status"], "platform_unavailable");
}

#[tokio::test]
async fn test_refresh_updates_and_inputs_use_it() {
    let platform = FakePlatform::new();
    platform.add_user(
        "shroud",
        "37402112",
        vec![
            BroadcastRecord::new(100, "1h"),
            BroadcastRecord::new(300, "1h"),
        ],
    );
    let app = setup_app(
        Some(platform.clone() as SharedPlatform),
        PathBuf::from("/nonexistent/streamers.txt"),
    )
    .await;

    let response = app
        .clone()
        .oneshot(test_request(
            "POST",
            "/api/channels/SHROUD/vod-summary/refresh?vod_count=10",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["channel"], "shroud");
    assert_eq!(body["outcome"]["status"], "updated");
    assert_eq!(body["outcome"]["summary"]["views_per_hour"], 200.0);

    let response = app
        .oneshot(test_request("GET", "/api/channels/shroud/inputs"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["inputs"]["vod_views_per_hour"], 200.0);
    assert_eq!(body["inputs"]["live_status"], "OFFLINE");
}

#[tokio::test]
async fn test_refresh_unknown_channel() {
    let platform = FakePlatform::new();
    let app = setup_app(
        Some(platform as SharedPlatform),
        PathBuf::from("/nonexistent/streamers.txt"),
    )
    .await;

    let response = app
        .oneshot(test_request("POST", "/api/channels/ghost/vod-summary/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"]["status"], "channel_not_found");
}
