//! The serialized fetch → analyze → format → notify cycle.
//!
//! Every cycle (scheduled daily report, hourly critical check, manual
//! trigger, analysis preview) takes the same lock, so two cycles never
//! interleave their FRED requests or messages.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::Instrument;

use econ_common::config::ScheduleConfig;
use econ_common::cycle_span;
use econ_common::logging::generate_trace_id;

use crate::analysis::{analyze, critical_alerts, AnalysisResult};
use crate::catalog::{Indicator, IndicatorCatalog};
use crate::data::{DataSource, YieldCurveStatus};
use crate::notification::Notifier;
use crate::report::ReportFormatter;

/// Whole-cycle failures.
#[derive(Debug, Clone, Error)]
pub enum CycleError {
    /// Not a single series could be fetched
    #[error("no indicator data available ({missing} series unavailable)")]
    NoData { missing: usize },
}

impl From<CycleError> for econ_common::Error {
    fn from(err: CycleError) -> Self {
        econ_common::Error::NoData(err.to_string())
    }
}

/// Analysis plus the yield curve reading it was reported with.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub analysis: AnalysisResult,
    pub yield_curve: Option<YieldCurveStatus>,
}

/// Result of a daily report cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub analysis: AnalysisResult,
    pub yield_curve: Option<YieldCurveStatus>,
    pub delivered: bool,
}

/// Result of an hourly critical check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CriticalCheck {
    pub alerts: Vec<String>,
    /// `false` when nothing needed sending
    pub delivered: bool,
}

/// Orchestrates collaborators for each cycle.
pub struct ReportPipeline {
    source: Arc<dyn DataSource>,
    notifier: Arc<dyn Notifier>,
    catalog: IndicatorCatalog,
    formatter: ReportFormatter,
    cycle_lock: Mutex<()>,
}

impl ReportPipeline {
    pub fn new(
        source: Arc<dyn DataSource>,
        notifier: Arc<dyn Notifier>,
        catalog: IndicatorCatalog,
        formatter: ReportFormatter,
    ) -> Self {
        Self {
            source,
            notifier,
            catalog,
            formatter,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &IndicatorCatalog {
        &self.catalog
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn formatter(&self) -> &ReportFormatter {
        &self.formatter
    }

    // ========================================================================
    // Cycles
    // ========================================================================

    /// Fetch, analyze and deliver the daily report.
    ///
    /// An empty snapshot sends a failure alert and returns an error. A failed
    /// delivery is reported through `delivered`, not as an error.
    pub async fn run_daily_report(&self) -> Result<DailyReport, CycleError> {
        match self.generate_daily_report().await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.send_failure_alert(&e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Daily report without the failure alert; callers that retry decide
    /// when to raise it.
    pub async fn generate_daily_report(&self) -> Result<DailyReport, CycleError> {
        let _guard = self.cycle_lock.lock().await;
        let trace_id = generate_trace_id();

        async {
            tracing::info!(indicators = self.catalog.len(), "Starting daily report");

            let evaluation = match self.collect_and_analyze().await {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    tracing::error!(error = %e, "Daily report failed");
                    return Err(e);
                }
            };

            let message = self
                .formatter
                .daily_report(&evaluation.analysis, evaluation.yield_curve.as_ref());
            let delivered = self.notifier.send(&message).await;

            if delivered {
                tracing::info!(
                    phase = evaluation.analysis.market_phase.label(),
                    risk = evaluation.analysis.risk.tier.label(),
                    alerts = evaluation.analysis.alerts.len(),
                    "Daily report delivered"
                );
            } else {
                tracing::error!("Daily report could not be delivered");
            }

            Ok(DailyReport {
                analysis: evaluation.analysis,
                yield_curve: evaluation.yield_curve,
                delivered,
            })
        }
        .instrument(cycle_span!("daily_report", trace_id))
        .await
    }

    /// Tell the chat that report generation failed.
    pub async fn send_failure_alert(&self, reason: &str) -> bool {
        self.notifier
            .send(&self.formatter.failure_alert(reason))
            .await
    }

    /// Analyze without sending anything.
    pub async fn evaluate(&self) -> Result<Evaluation, CycleError> {
        let _guard = self.cycle_lock.lock().await;
        let trace_id = generate_trace_id();

        self.collect_and_analyze()
            .instrument(cycle_span!("preview", trace_id))
            .await
    }

    /// Check jobless claims, the Sahm rule and the yield curve; send one
    /// urgent message if any crossed its line.
    pub async fn run_critical_check(&self) -> CriticalCheck {
        let _guard = self.cycle_lock.lock().await;
        let trace_id = generate_trace_id();

        async {
            let claims = self.latest_value(Indicator::JoblessClaims).await;
            let sahm = self.latest_value(Indicator::SahmRule).await;
            let curve = self.fetch_yield_curve().await;

            let alerts = critical_alerts(claims, sahm, curve.as_ref());
            if alerts.is_empty() {
                tracing::debug!("Critical check clear");
                return CriticalCheck::default();
            }

            let message = self.formatter.critical_alert(&alerts, Utc::now());
            let delivered = self.notifier.send(&message).await;
            tracing::warn!(count = alerts.len(), delivered, "Critical alerts raised");

            CriticalCheck { alerts, delivered }
        }
        .instrument(cycle_span!("critical_check", trace_id))
        .await
    }

    pub async fn send_test_message(&self) -> bool {
        self.notifier.send(&self.formatter.test_message()).await
    }

    /// Announce that the service is up.
    pub async fn announce_startup(&self, schedule: &ScheduleConfig) -> bool {
        let message = self.formatter.startup_message(self.catalog.len(), schedule);
        self.notifier.send(&message).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn collect_and_analyze(&self) -> Result<Evaluation, CycleError> {
        let codes = self.catalog.codes();
        let snapshot = self.source.fetch_latest(&codes).await;

        if snapshot.is_empty() {
            return Err(CycleError::NoData {
                missing: snapshot.missing.len(),
            });
        }

        let yield_curve = self.fetch_yield_curve().await;
        let analysis = analyze(&snapshot);

        tracing::info!(
            updated = analysis.summary.updated,
            total = analysis.summary.total,
            phase = analysis.market_phase.label(),
            risk_percent = analysis.risk.percent,
            "Analysis complete"
        );

        Ok(Evaluation {
            analysis,
            yield_curve,
        })
    }

    async fn fetch_yield_curve(&self) -> Option<YieldCurveStatus> {
        let ten = self.source.fetch_series(Indicator::Treasury10Y.code()).await;
        let two = self.source.fetch_series(Indicator::Treasury2Y.code()).await;

        match (ten, two) {
            (Ok(ten), Ok(two)) => YieldCurveStatus::from_series(&ten, &two),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Yield curve unavailable");
                None
            }
        }
    }

    async fn latest_value(&self, indicator: Indicator) -> Option<f64> {
        match self.source.fetch_series(indicator.code()).await {
            Ok(points) => points.iter().map(|p| p.value).find(|v| v.is_finite()),
            Err(e) => {
                tracing::warn!(code = indicator.code(), error = %e, "Series unavailable");
                None
            }
        }
    }
}
