//! Econ Watch - US economic indicator briefings over Telegram.
//!
//! Fetches FRED series, judges market phase and recession risk, and sends a
//! daily report plus hourly critical alerts.

use anyhow::{Context, Result};
use econ_common::config::Config;
use econ_common::logging::init_logging_with_exclusions;
use econ_watch::WatchService;

#[tokio::main]
async fn main() -> Result<()> {
    // Start timing immediately for cold-start measurement
    let startup_start = std::time::Instant::now();

    // ECON_WATCH_CONFIG points at a single JSON file instead of ~/.econ-watch/
    let config = match std::env::var("ECON_WATCH_CONFIG") {
        Ok(path) => {
            let mut config = Config::load_from(std::path::Path::new(&path))?;
            config.apply_env_overrides();
            config
        }
        Err(_) => Config::load_with_env()?,
    };

    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Econ Watch v{}", env!("CARGO_PKG_VERSION"));

    config
        .validate()
        .context("Configuration incomplete, set the missing values in config or environment")?;

    let service = WatchService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
