//! # viewval Common Library
//!
//! Shared code for the viewval services including:
//! - Channel identifiers and the allow-list file format
//! - Broadcast duration parsing and VOD aggregation
//! - Viewer statistics models handed to the projection engine
//! - Configuration loading
//! - SQLite-backed statistics cache

pub mod allowlist;
pub mod channel;
pub mod config;
pub mod db;
pub mod duration;
pub mod error;
pub mod models;
pub mod time;
pub mod vod;

pub use channel::ChannelId;
pub use error::{Error, Result};
pub use vod::{summarize_broadcasts, BroadcastRecord, VodSummary};
