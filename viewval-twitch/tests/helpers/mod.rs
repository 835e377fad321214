//! Test Helper Utilities
//!
//! In-memory cache and a scripted stream platform shared by the
//! viewval-twitch integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use viewval_common::db::init_memory_database;
use viewval_common::{BroadcastRecord, ChannelId};
use viewval_twitch::services::{LiveStream, SourceError, SqliteStatsCache, StreamPlatform};

pub fn channel(raw: &str) -> ChannelId {
    ChannelId::new(raw).unwrap()
}

pub async fn memory_cache() -> SqliteStatsCache {
    SqliteStatsCache::new(init_memory_database().await.unwrap())
}

/// Platform whose answers are set up by the test
#[derive(Default)]
pub struct FakePlatform {
    live: Mutex<HashMap<ChannelId, u64>>,
    users: Mutex<HashMap<ChannelId, String>>,
    broadcasts: Mutex<HashMap<String, Vec<BroadcastRecord>>>,
    fail_probe: Mutex<bool>,
    fail_lookup: Mutex<bool>,
    fail_fetch: Mutex<bool>,
    pub probe_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub last_limit: AtomicUsize,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_live(&self, login: &str, viewers: u64) {
        self.live.lock().unwrap().insert(channel(login), viewers);
    }

    pub fn add_user(&self, login: &str, user_id: &str, broadcasts: Vec<BroadcastRecord>) {
        self.users
            .lock()
            .unwrap()
            .insert(channel(login), user_id.to_string());
        self.broadcasts
            .lock()
            .unwrap()
            .insert(user_id.to_string(), broadcasts);
    }

    pub fn fail_probe(&self) {
        *self.fail_probe.lock().unwrap() = true;
    }

    pub fn fail_lookup(&self) {
        *self.fail_lookup.lock().unwrap() = true;
    }

    pub fn fail_fetch(&self) {
        *self.fail_fetch.lock().unwrap() = true;
    }
}

#[async_trait]
impl StreamPlatform for FakePlatform {
    async fn probe_live(
        &self,
        channels: &[ChannelId],
    ) -> Result<HashMap<ChannelId, LiveStream>, SourceError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_probe.lock().unwrap() {
            return Err(SourceError::Transport("connection reset".to_string()));
        }
        let live = self.live.lock().unwrap();
        Ok(channels
            .iter()
            .filter_map(|id| {
                live.get(id)
                    .map(|&viewer_count| (id.clone(), LiveStream { viewer_count }))
            })
            .collect())
    }

    async fn resolve_user_ids(
        &self,
        channels: &[ChannelId],
    ) -> Result<HashMap<ChannelId, String>, SourceError> {
        if *self.fail_lookup.lock().unwrap() {
            return Err(SourceError::Api(503, "service unavailable".to_string()));
        }
        let users = self.users.lock().unwrap();
        Ok(channels
            .iter()
            .filter_map(|id| users.get(id).map(|user_id| (id.clone(), user_id.clone())))
            .collect())
    }

    async fn fetch_recent_broadcasts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<BroadcastRecord>, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);
        if *self.fail_fetch.lock().unwrap() {
            return Err(SourceError::Transport("timed out".to_string()));
        }
        let broadcasts = self.broadcasts.lock().unwrap();
        Ok(broadcasts
            .get(user_id)
            .map(|records| records.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
