//! Integration tests for the live sample collector

mod helpers;

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use helpers::{channel, memory_cache, FakePlatform};
use tempfile::NamedTempFile;
use viewval_twitch::services::{Collector, RoundSummary, StatsCache};

fn channels_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_round_records_live_and_offline() {
    let platform = FakePlatform::new();
    platform.set_live("shroud", 4_000);
    let cache = memory_cache().await;
    let file = channels_file("# watched\nShroud\n\nxqc\nshroud\n");

    let collector = Collector::new(
        cache.clone(),
        platform.clone(),
        file.path().to_path_buf(),
        Duration::from_secs(60),
    );
    let summary = collector.collect_round().await.unwrap();

    assert_eq!(
        summary,
        RoundSummary {
            channels: 2,
            live: 1,
            offline: 1,
            skipped: false,
        }
    );

    let live = cache.read_snapshot(&channel("shroud")).await.unwrap();
    assert_eq!(live.live_samples_30d, 1);
    assert_eq!(live.avg_viewers_30d, Some(4_000.0));

    let offline = cache.read_snapshot(&channel("xqc")).await.unwrap();
    assert_eq!(offline.live_samples_30d, 0);
    assert_eq!(offline.avg_viewers_30d, None);
    assert!(offline.last_any_sample_utc.is_some());
}

#[tokio::test]
async fn test_live_lookup_failure_skips_round() {
    let platform = FakePlatform::new();
    platform.fail_probe();
    let cache = memory_cache().await;
    let file = channels_file("shroud\n");

    let collector = Collector::new(
        cache.clone(),
        platform,
        file.path().to_path_buf(),
        Duration::from_secs(60),
    );
    let summary = collector.collect_round().await.unwrap();

    assert!(summary.skipped);
    assert_eq!(summary.live + summary.offline, 0);

    let snapshot = cache.read_snapshot(&channel("shroud")).await.unwrap();
    assert!(snapshot.last_any_sample_utc.is_none());
}

#[tokio::test]
async fn test_missing_allow_list_is_empty_round() {
    let platform = FakePlatform::new();
    let collector = Collector::new(
        memory_cache().await,
        platform.clone(),
        PathBuf::from("/nonexistent/streamers.txt"),
        Duration::from_secs(60),
    );

    let summary = collector.collect_round().await.unwrap();
    assert_eq!(summary, RoundSummary::default());
    assert_eq!(platform.probe_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let platform = FakePlatform::new();
    let file = channels_file("shroud\n");
    let collector = Collector::new(
        memory_cache().await,
        Arc::clone(&platform),
        file.path().to_path_buf(),
        Duration::from_secs(3600),
    );

    tokio::time::timeout(
        Duration::from_secs(5),
        collector.run(tokio::time::sleep(Duration::from_millis(50))),
    )
    .await
    .expect("collector should stop when shutdown resolves");

    // First tick fires immediately; the next one is an hour away
    assert_eq!(platform.probe_calls.load(Ordering::SeqCst), 1);
}
