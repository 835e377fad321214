//! viewval - Twitch viewer statistics service
//!
//! Subcommands:
//! - `serve`: JSON API on the configured port
//! - `collect`: periodic live sampling of the allow-listed channels
//! - `inputs`: resolve projection inputs for one channel and print them
//! - `channels`: print the allow-list

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use viewval_common::allowlist::load_channel_list;
use viewval_common::config::{self, AppConfig, CliOverrides, MAX_VOD_COUNT};
use viewval_common::db::init_database;
use viewval_common::models::{
    OverrideSet, ProjectionRequest, DEFAULT_CHURN_FACTOR, DEFAULT_PLANNED_HOURS,
};
use viewval_common::ChannelId;
use viewval_twitch::api::channels::InputsResponse;
use viewval_twitch::logging::init_logging;
use viewval_twitch::services::{Collector, HelixClient, SqliteStatsCache, StatsOrchestrator};
use viewval_twitch::{build_router, AppState, Orchestrator, SharedPlatform};

/// Command-line arguments for viewval
#[derive(Parser, Debug)]
#[command(name = "viewval")]
#[command(about = "Twitch viewer statistics for influencer pricing")]
#[command(version)]
struct Args {
    /// Configuration file (default: ~/.config/viewval/config.toml)
    #[arg(short, long, env = "VIEWVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the statistics database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Sample live status of the allow-listed channels
    Collect {
        /// Allow-list file
        #[arg(long)]
        channels_file: Option<PathBuf>,

        /// Seconds between rounds
        #[arg(long)]
        interval: Option<u64>,

        /// Run a single round and exit
        #[arg(long)]
        once: bool,
    },

    /// Resolve projection inputs for one channel
    Inputs {
        channel: String,

        /// Refresh the VOD summary before resolving
        #[arg(long)]
        refresh: bool,

        /// VOD count for the refresh (1..=100)
        #[arg(long)]
        vod_count: Option<usize>,

        /// Replace the 30-day average and peak with the manual values
        #[arg(long)]
        manual: bool,

        /// Manual average viewers; implies --manual
        #[arg(long)]
        manual_avg: Option<f64>,

        /// Manual peak viewers; implies --manual
        #[arg(long)]
        manual_peak: Option<i64>,

        #[arg(long, default_value_t = DEFAULT_PLANNED_HOURS)]
        planned_hours: f64,

        #[arg(long, default_value_t = DEFAULT_CHURN_FACTOR)]
        churn_factor: f64,
    },

    /// Print the allow-list
    Channels {
        #[arg(long)]
        channels_file: Option<PathBuf>,
    },
}

impl Command {
    fn cli_overrides(&self, root_folder: Option<PathBuf>) -> CliOverrides {
        let (port, channels_file) = match self {
            Command::Serve { port } => (*port, None),
            Command::Collect { channels_file, .. } | Command::Channels { channels_file } => {
                (None, channels_file.clone())
            }
            Command::Inputs { .. } => (None, None),
        };
        CliOverrides {
            root_folder,
            port,
            channels_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_filter = init_logging()?;

    let args = Args::parse();

    let config_path = args.config.clone().or_else(config::default_config_path);
    let toml_config = config::load_toml_config(config_path.as_deref());
    let app_config = AppConfig::resolve(
        &args.command.cli_overrides(args.root_folder.clone()),
        toml_config,
    );
    log_filter.apply_config_level(&app_config.log_level);

    info!("Starting viewval v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }
    info!("Database path: {}", app_config.database_path.display());

    match args.command {
        Command::Serve { .. } => serve(&app_config).await,
        Command::Collect { interval, once, .. } => collect(&app_config, interval, once).await,
        Command::Inputs {
            channel,
            refresh,
            vod_count,
            manual,
            manual_avg,
            manual_peak,
            planned_hours,
            churn_factor,
        } => {
            let overrides = cli_overrides_set(manual, manual_avg, manual_peak);
            let vod_count = vod_count.unwrap_or(app_config.stats.default_vod_count);
            let refresh = refresh.then_some(vod_count);
            inputs(&app_config, &channel, &overrides, refresh, planned_hours, churn_factor).await
        }
        Command::Channels { .. } => {
            let channels = load_channel_list(&app_config.stats.channels_file)
                .with_context(|| {
                    format!("Failed to read {}", app_config.stats.channels_file.display())
                })?;
            for channel in channels {
                println!("{}", channel);
            }
            Ok(())
        }
    }
}

/// Manual mode is on when requested or when any manual value is given
fn cli_overrides_set(manual: bool, manual_avg: Option<f64>, manual_peak: Option<i64>) -> OverrideSet {
    if manual || manual_avg.is_some() || manual_peak.is_some() {
        OverrideSet::manual(manual_avg, manual_peak)
    } else {
        OverrideSet::default()
    }
}

/// Helix client from configured credentials; `None` disables the platform
fn build_platform(app_config: &AppConfig) -> Option<SharedPlatform> {
    let Some(credentials) = app_config.credentials.clone() else {
        warn!("Twitch credentials not configured: live status and VOD refresh unavailable");
        return None;
    };

    match HelixClient::new(credentials) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("Failed to create Helix client: {}", e);
            None
        }
    }
}

async fn open_cache(app_config: &AppConfig) -> Result<SqliteStatsCache> {
    let pool = init_database(&app_config.database_path)
        .await
        .context("Failed to initialize database")?;
    Ok(SqliteStatsCache::new(pool))
}

async fn build_orchestrator(app_config: &AppConfig) -> Result<Orchestrator> {
    let cache = open_cache(app_config).await?;
    Ok(StatsOrchestrator::new(
        cache,
        build_platform(app_config),
        app_config.stats.vod_cache_max_age_hours,
    ))
}

async fn serve(app_config: &AppConfig) -> Result<()> {
    let orchestrator = build_orchestrator(app_config).await?;
    let state = AppState::new(
        orchestrator,
        app_config.stats.channels_file.clone(),
        app_config.stats.default_vod_count,
    );
    let app = build_router(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], app_config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("viewval listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.orchestrator.cache().pool().close().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn collect(app_config: &AppConfig, interval: Option<u64>, once: bool) -> Result<()> {
    let platform = build_platform(app_config)
        .context("Twitch credentials are required for collection")?;
    let cache = open_cache(app_config).await?;
    let interval_secs = interval.unwrap_or(app_config.stats.collect_interval_secs).max(1);

    let collector = Collector::new(
        cache.clone(),
        platform,
        app_config.stats.channels_file.clone(),
        Duration::from_secs(interval_secs),
    );

    if once {
        let summary = collector.collect_round().await?;
        info!(
            "Round complete: {} channels, {} live, {} offline{}",
            summary.channels,
            summary.live,
            summary.offline,
            if summary.skipped { " (skipped)" } else { "" }
        );
    } else {
        collector.run(shutdown_signal()).await;
    }

    cache.pool().close().await;
    Ok(())
}

async fn inputs(
    app_config: &AppConfig,
    channel: &str,
    overrides: &OverrideSet,
    refresh: Option<usize>,
    planned_hours: f64,
    churn_factor: f64,
) -> Result<()> {
    let channel = ChannelId::new(channel)?;
    if let Some(count) = refresh {
        anyhow::ensure!(
            (1..=MAX_VOD_COUNT).contains(&count),
            "--vod-count must be between 1 and {}",
            MAX_VOD_COUNT
        );
    }

    let orchestrator = build_orchestrator(app_config).await?;
    let report = orchestrator.resolve(&channel, overrides, refresh).await?;
    let projection = ProjectionRequest::new(report.inputs.clone(), planned_hours, churn_factor)?;

    let output = serde_json::to_string_pretty(&InputsResponse { report, projection })
        .context("Failed to serialize report")?;
    println!("{}", output);

    orchestrator.cache().pool().close().await;
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
