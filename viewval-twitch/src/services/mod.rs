//! Services for viewval-twitch

pub mod collector;
pub mod helix_client;
pub mod platform;
pub mod sqlite_cache;
pub mod stats_orchestrator;

pub use collector::{Collector, RoundSummary};
pub use helix_client::{HelixClient, HelixError};
pub use platform::{LiveStream, SourceError, StatsCache, StreamPlatform};
pub use sqlite_cache::SqliteStatsCache;
pub use stats_orchestrator::{ChannelReport, RefreshOutcome, StatsOrchestrator};
