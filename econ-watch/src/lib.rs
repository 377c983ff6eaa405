//! Econ Watch Library
//!
//! Tracks US economic indicators from FRED, classifies them against fixed
//! thresholds, judges the market phase and recession risk, and delivers
//! reports to Telegram on a schedule.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       econ-watch (Rust Service)                     │
//! │                               :8080                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────┐  │
//! │  │  FRED Data   │─▶│  Analysis    │─▶│  Report      │─▶│ Telegram│  │
//! │  │  Source      │  │  Engine      │  │  Formatter   │  │         │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────┘  │
//! │          ▲                                                          │
//! │  ┌───────┴──────┐      ┌──────────────┐                             │
//! │  │  Scheduler   │      │  HTTP routes │  (manual trigger, preview)  │
//! │  └──────────────┘      └──────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Cycles
//!
//! - **Daily report**: full fetch, analysis and briefing (08:00 local)
//! - **Critical check**: jobless claims, Sahm rule and yield curve (hourly)

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod analysis;
pub mod catalog;
pub mod data;
pub mod notification;
pub mod pipeline;
pub mod report;
pub mod routes;
pub mod scheduler;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

use econ_common::config::Config;

use crate::catalog::IndicatorCatalog;
use crate::data::{DataSource, FredClient};
use crate::notification::{Notifier, TelegramNotifier};
use crate::pipeline::ReportPipeline;
use crate::report::ReportFormatter;
use crate::scheduler::ReportScheduler;

/// Shared service state
pub struct WatchState {
    /// Configuration
    pub config: Config,
    /// Fetch/analyze/notify cycles
    pub pipeline: Arc<ReportPipeline>,
    /// Cron scheduler driving the pipeline
    pub scheduler: Arc<ReportScheduler>,
}

impl WatchState {
    /// Build state with the FRED client and Telegram notifier.
    pub fn new(config: Config) -> Result<Self> {
        let source: Arc<dyn DataSource> = Arc::new(FredClient::new(
            config.fred_api_key().unwrap_or_default(),
            &config.fred,
        ));
        let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::from_config(&config));

        Self::with_components(config, source, notifier)
    }

    /// Build state around an explicit source and notifier.
    pub fn with_components(
        config: Config,
        source: Arc<dyn DataSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let catalog =
            IndicatorCatalog::from_config(&config.fred).context("Invalid indicator selection")?;
        let formatter =
            ReportFormatter::from_config(&config.schedule).context("Invalid schedule timezone")?;

        let pipeline = Arc::new(ReportPipeline::new(source, notifier, catalog, formatter));
        let scheduler = Arc::new(ReportScheduler::new(&config.schedule, pipeline.clone())?);

        Ok(Self {
            config,
            pipeline,
            scheduler,
        })
    }
}

/// Main watch service
pub struct WatchService {
    state: Arc<WatchState>,
}

impl WatchService {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            state: Arc::new(WatchState::new(config)?),
        })
    }

    /// Start the scheduler and HTTP server; returns after Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let app = routes::build_router(self.state.clone());

        tracing::info!(
            indicators = self.state.pipeline.catalog().len(),
            source = self.state.pipeline.source().name(),
            notifier_enabled = self.state.pipeline.notifier().is_enabled(),
            "Watch service starting"
        );

        if let Err(e) = self.state.pipeline.source().health_check().await {
            tracing::warn!(error = %e, "Data source health check failed at startup");
        }

        if !self
            .state
            .pipeline
            .announce_startup(&self.state.config.schedule)
            .await
        {
            tracing::warn!("Startup notification was not delivered");
        }

        let scheduler = self.state.scheduler.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler.run().await {
                tracing::error!(error = %e, "Report scheduler failed");
            }
        });

        let addr: SocketAddr = self
            .state
            .config
            .listen_addr()
            .parse()
            .context("Invalid listen address")?;
        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.state.scheduler.stop().await;
        tracing::info!("Watch service stopped");

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
