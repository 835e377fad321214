//! Configuration loading and resolution
//!
//! Bootstrap settings come from four tiers, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file (`~/.config/viewval/config.toml`)
//! 4. Compiled default
//!
//! A missing or unreadable TOML file is not fatal: a warning is logged and
//! the defaults apply. Missing Twitch credentials only disable the platform
//! features (live status, VOD refresh, collector).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_ROOT_FOLDER: &str = "VIEWVAL_ROOT_FOLDER";
pub const ENV_PORT: &str = "VIEWVAL_PORT";
pub const ENV_CLIENT_ID: &str = "TWITCH_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "TWITCH_CLIENT_SECRET";

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_VOD_CACHE_MAX_AGE_HOURS: f64 = 12.0;
pub const DEFAULT_VOD_COUNT: usize = 20;
pub const MAX_VOD_COUNT: usize = 100;
pub const DEFAULT_CHANNELS_FILE: &str = "streamers.txt";
pub const DEFAULT_COLLECT_INTERVAL_SECS: u64 = 120;
const DATABASE_FILE_NAME: &str = "viewval.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database file, overrides `<root_folder>/viewval.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub twitch: TwitchConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Twitch application credentials as written in TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwitchConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub port: Option<u16>,
}

/// Stats orchestration tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Cached VOD summaries older than this are ignored
    #[serde(default = "default_vod_cache_max_age_hours")]
    pub vod_cache_max_age_hours: f64,

    /// VODs fetched per refresh when the caller does not say
    #[serde(default = "default_vod_count")]
    pub default_vod_count: usize,

    /// Allow-list of channels, one login per line
    #[serde(default = "default_channels_file")]
    pub channels_file: PathBuf,

    /// Seconds between collector rounds
    #[serde(default = "default_collect_interval_secs")]
    pub collect_interval_secs: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            vod_cache_max_age_hours: default_vod_cache_max_age_hours(),
            default_vod_count: default_vod_count(),
            channels_file: default_channels_file(),
            collect_interval_secs: default_collect_interval_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_vod_cache_max_age_hours() -> f64 {
    DEFAULT_VOD_CACHE_MAX_AGE_HOURS
}

fn default_vod_count() -> usize {
    DEFAULT_VOD_COUNT
}

fn default_channels_file() -> PathBuf {
    PathBuf::from(DEFAULT_CHANNELS_FILE)
}

fn default_collect_interval_secs() -> u64 {
    DEFAULT_COLLECT_INTERVAL_SECS
}

/// Twitch app credentials (client-credentials grant)
#[derive(Clone, PartialEq, Eq)]
pub struct TwitchCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for TwitchCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitchCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub channels_file: Option<PathBuf>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub port: u16,
    pub log_level: String,
    pub credentials: Option<TwitchCredentials>,
    pub stats: StatsConfig,
}

impl AppConfig {
    /// Merge CLI, environment and TOML tiers
    pub fn resolve(cli: &CliOverrides, toml: TomlConfig) -> Self {
        let root_folder = resolve_root_folder(cli.root_folder.as_deref(), &toml);
        let database_path = toml
            .database_path
            .clone()
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME));
        let port = resolve_port(cli.port, &toml);
        let credentials = resolve_twitch_credentials(&toml);

        let mut stats = toml.stats;
        if let Some(path) = &cli.channels_file {
            stats.channels_file = path.clone();
        }
        if stats.default_vod_count == 0 || stats.default_vod_count > MAX_VOD_COUNT {
            warn!(
                "default_vod_count {} outside 1..={}, using {}",
                stats.default_vod_count, MAX_VOD_COUNT, DEFAULT_VOD_COUNT
            );
            stats.default_vod_count = DEFAULT_VOD_COUNT;
        }
        if !(stats.vod_cache_max_age_hours > 0.0) {
            warn!(
                "vod_cache_max_age_hours {} is not positive, using {}",
                stats.vod_cache_max_age_hours, DEFAULT_VOD_CACHE_MAX_AGE_HOURS
            );
            stats.vod_cache_max_age_hours = DEFAULT_VOD_CACHE_MAX_AGE_HOURS;
        }

        Self {
            root_folder,
            database_path,
            port,
            log_level: toml.logging.level,
            credentials,
            stats,
        }
    }
}

/// Default configuration file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("viewval").join("config.toml"))
}

/// Load TOML configuration, falling back to defaults
///
/// `path = None` uses [`default_config_path`].
pub fn load_toml_config(path: Option<&Path>) -> TomlConfig {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            warn!("Could not determine config directory, using defaults");
            return TomlConfig::default();
        }
    };

    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return TomlConfig::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<TomlConfig>(&content) {
            Ok(config) => {
                info!("Loaded config: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Invalid config file {}: {}. Using defaults", path.display(), e);
                TomlConfig::default()
            }
        },
        Err(e) => {
            warn!("Could not read config file {}: {}. Using defaults", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// Root folder: CLI → `VIEWVAL_ROOT_FOLDER` → TOML → OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = non_blank_env(ENV_ROOT_FOLDER) {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// HTTP port: CLI → `VIEWVAL_PORT` → TOML → 5780
pub fn resolve_port(cli_arg: Option<u16>, toml: &TomlConfig) -> u16 {
    if let Some(port) = cli_arg {
        return port;
    }

    if let Some(value) = non_blank_env(ENV_PORT) {
        match value.parse::<u16>() {
            Ok(port) => return port,
            Err(_) => warn!("Ignoring invalid {}={}", ENV_PORT, value),
        }
    }

    toml.server.port.unwrap_or(DEFAULT_PORT)
}

/// Twitch credentials: environment first, then TOML
///
/// Both halves must be present and non-blank in the same tier.
pub fn resolve_twitch_credentials(toml: &TomlConfig) -> Option<TwitchCredentials> {
    if let (Some(client_id), Some(client_secret)) =
        (non_blank_env(ENV_CLIENT_ID), non_blank_env(ENV_CLIENT_SECRET))
    {
        info!("Twitch credentials loaded from environment");
        return Some(TwitchCredentials {
            client_id,
            client_secret,
        });
    }

    let client_id = toml.twitch.client_id.as_deref().filter(|s| is_valid_key(s));
    let client_secret = toml.twitch.client_secret.as_deref().filter(|s| is_valid_key(s));
    if let (Some(client_id), Some(client_secret)) = (client_id, client_secret) {
        info!("Twitch credentials loaded from TOML config");
        return Some(TwitchCredentials {
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
        });
    }

    None
}

/// Validate credential value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("viewval"))
        .unwrap_or_else(|| PathBuf::from("./viewval_data"))
}
