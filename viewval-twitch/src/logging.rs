//! Tracing setup
//!
//! The subscriber is installed before configuration is loaded so that config
//! warnings reach the log. The `[logging] level` from TOML is applied once the
//! config is resolved, unless `RUST_LOG` already chose a filter.

use tracing::warn;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

const DEFAULT_DIRECTIVE: &str = "info";

/// Handle for swapping the filter after startup
pub struct LogFilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogFilterHandle {
    /// Apply the configured level; a `RUST_LOG` filter takes precedence
    pub fn apply_config_level(&self, level: &str) {
        if self.from_env {
            return;
        }
        match config_filter(level) {
            Ok(filter) => {
                if let Err(e) = self.handle.reload(filter) {
                    warn!("Failed to apply log level {:?}: {}", level, e);
                }
            }
            Err(e) => warn!(
                "Invalid log level {:?} in config, keeping {}: {}",
                level, DEFAULT_DIRECTIVE, e
            ),
        }
    }
}

/// Install the global subscriber
pub fn init_logging() -> anyhow::Result<LogFilterHandle> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, from_env) = initial_filter(rust_log.as_deref());
    let (filter_layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(LogFilterHandle { handle, from_env })
}

/// Startup filter: a valid non-blank `RUST_LOG`, otherwise `info`
fn initial_filter(rust_log: Option<&str>) -> (EnvFilter, bool) {
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directive) => match EnvFilter::try_new(directive) {
            Ok(filter) => (filter, true),
            Err(_) => (EnvFilter::new(DEFAULT_DIRECTIVE), false),
        },
        None => (EnvFilter::new(DEFAULT_DIRECTIVE), false),
    }
}

fn config_filter(level: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(level.trim())
}
