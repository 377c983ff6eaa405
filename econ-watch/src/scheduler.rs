//! Cron-based scheduler for the daily report and the hourly critical check.
//!
//! Cron expressions (six fields, seconds first) are evaluated in the
//! configured local offset, so `0 0 8 * * *` with `utc_offset_hours = 9`
//! fires at 08:00 KST regardless of the host timezone.
//!
//! # Schedule Configuration
//!
//! ```json
//! {
//!   "schedule": {
//!     "enabled": true,
//!     "daily_report": "0 0 8 * * *",
//!     "critical_check": "0 0 * * * *",
//!     "utc_offset_hours": 9,
//!     "timezone_label": "KST",
//!     "max_retries": 1
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

use econ_common::config::ScheduleConfig;

use crate::pipeline::ReportPipeline;

/// Consecutive failed runs before an escalated log entry.
const FAILURE_ALERT_THRESHOLD: u32 = 3;

/// How often due schedules are checked.
const CHECK_INTERVAL_SECS: u64 = 10;

/// Retry delays stop doubling after this many attempts (64s).
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

/// Scheduled task type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledTask {
    /// Full report, once a day
    DailyReport,
    /// Claims / Sahm / yield curve check
    CriticalCheck,
}

impl ScheduledTask {
    /// Get task name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::DailyReport => "daily_report",
            Self::CriticalCheck => "critical_check",
        }
    }
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Work the scheduler triggers.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn daily_report(&self) -> Result<()>;

    async fn critical_check(&self) -> Result<()>;

    /// Called once when a task has failed every attempt.
    async fn report_failure(&self, _task: ScheduledTask, _error: &anyhow::Error) {}
}

#[async_trait]
impl CycleRunner for ReportPipeline {
    async fn daily_report(&self) -> Result<()> {
        let report = self.generate_daily_report().await?;
        if !report.delivered {
            tracing::warn!("Daily report generated but not delivered");
        }
        Ok(())
    }

    async fn critical_check(&self) -> Result<()> {
        self.run_critical_check().await;
        Ok(())
    }

    async fn report_failure(&self, task: ScheduledTask, error: &anyhow::Error) {
        if task == ScheduledTask::DailyReport {
            self.send_failure_alert(&error.to_string()).await;
        }
    }
}

/// A parsed schedule with its task type
struct ParsedSchedule {
    task: ScheduledTask,
    schedule: Schedule,
}

/// Report scheduler
pub struct ReportScheduler {
    enabled: bool,
    offset: FixedOffset,
    runner: Arc<dyn CycleRunner>,
    state: Arc<RwLock<SchedulerState>>,
    schedules: Vec<ParsedSchedule>,
    /// Last execution times for each task
    last_executions: Arc<RwLock<HashMap<ScheduledTask, DateTime<Utc>>>>,
    /// Consecutive failure counts for each task
    failure_counts: Arc<RwLock<HashMap<ScheduledTask, u32>>>,
    /// Attempts per run, at least 1
    max_retries: u32,
}

impl ReportScheduler {
    /// Create a new scheduler. Invalid cron expressions or offsets fail here.
    pub fn new(config: &ScheduleConfig, runner: Arc<dyn CycleRunner>) -> Result<Self> {
        let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600)
            .with_context(|| format!("Invalid UTC offset: {} hours", config.utc_offset_hours))?;

        let mut schedules = Vec::new();

        if config.enabled {
            schedules.push(ParsedSchedule {
                task: ScheduledTask::DailyReport,
                schedule: Schedule::from_str(&config.daily_report)
                    .with_context(|| format!("Invalid daily_report cron: {}", config.daily_report))?,
            });

            schedules.push(ParsedSchedule {
                task: ScheduledTask::CriticalCheck,
                schedule: Schedule::from_str(&config.critical_check).with_context(|| {
                    format!("Invalid critical_check cron: {}", config.critical_check)
                })?,
            });

            info!(
                daily_report = %config.daily_report,
                critical_check = %config.critical_check,
                timezone = %config.timezone_label,
                "Scheduler configured"
            );
        }

        Ok(Self {
            enabled: config.enabled,
            offset,
            runner,
            state: Arc::new(RwLock::new(SchedulerState::Stopped)),
            schedules,
            last_executions: Arc::new(RwLock::new(HashMap::new())),
            failure_counts: Arc::new(RwLock::new(HashMap::new())),
            max_retries: config.max_retries.max(1),
        })
    }

    /// Get current scheduler state
    pub async fn get_state(&self) -> SchedulerState {
        *self.state.read().await
    }

    /// Stop the scheduler loop after its current tick.
    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        *state = SchedulerState::Stopped;
        info!("Scheduler stopped");
    }

    /// Run the scheduler loop
    pub async fn run(&self) -> Result<()> {
        if !self.enabled {
            info!("Scheduler disabled, not starting");
            return Ok(());
        }

        {
            let mut state = self.state.write().await;
            *state = SchedulerState::Running;
        }

        info!("Scheduler started");

        let mut check_interval = interval(Duration::from_secs(CHECK_INTERVAL_SECS));

        loop {
            check_interval.tick().await;

            let current_state = *self.state.read().await;
            match current_state {
                SchedulerState::Stopped => break,
                SchedulerState::Running => self.check_and_execute(Utc::now()).await,
            }
        }

        Ok(())
    }

    /// Execute every task due at `now`.
    async fn check_and_execute(&self, now: DateTime<Utc>) {
        for parsed in &self.schedules {
            let last_exec = {
                let executions = self.last_executions.read().await;
                executions.get(&parsed.task).copied()
            };

            if is_due(&parsed.schedule, self.offset, last_exec, now) {
                self.execute_task(parsed.task).await;
            }
        }
    }

    /// Execute a scheduled task with retry logic
    async fn execute_task(&self, task: ScheduledTask) {
        info!(task = task.name(), "Executing scheduled task");

        {
            let mut executions = self.last_executions.write().await;
            executions.insert(task, Utc::now());
        }

        let mut last_error = None;
        for attempt in 1..=self.max_retries {
            let result = match task {
                ScheduledTask::DailyReport => self.runner.daily_report().await,
                ScheduledTask::CriticalCheck => self.runner.critical_check().await,
            };

            match result {
                Ok(()) => {
                    let mut failures = self.failure_counts.write().await;
                    failures.insert(task, 0);
                    return;
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        let backoff_ms = retry_backoff_ms(attempt);
                        debug!(task = task.name(), attempt, backoff_ms, "Task failed, retrying...");
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        if let Some(e) = last_error {
            error!(
                task = task.name(),
                error = %e,
                max_retries = self.max_retries,
                "Task execution failed after all retries"
            );
            self.runner.report_failure(task, &e).await;
            self.track_failure(task).await;
        }
    }

    /// Track task failure and escalate once the threshold is reached
    async fn track_failure(&self, task: ScheduledTask) {
        let failure_count = {
            let mut failures = self.failure_counts.write().await;
            let count = failures.entry(task).or_insert(0);
            *count += 1;
            *count
        };

        if failure_count >= FAILURE_ALERT_THRESHOLD {
            error!(
                task = task.name(),
                failure_count,
                threshold = FAILURE_ALERT_THRESHOLD,
                "ALERT: Task failure threshold exceeded! Check FRED and Telegram credentials."
            );

            let mut failures = self.failure_counts.write().await;
            failures.insert(task, 0);
        }
    }

    /// Next scheduled time for each task, soonest first
    pub fn get_next_schedules(&self) -> Vec<(ScheduledTask, DateTime<Utc>)> {
        let mut next_times: Vec<_> = self
            .schedules
            .iter()
            .filter_map(|parsed| {
                parsed
                    .schedule
                    .upcoming(self.offset)
                    .next()
                    .map(|next| (parsed.task, next.with_timezone(&Utc)))
            })
            .collect();

        next_times.sort_by_key(|(_, time)| *time);
        next_times
    }

    /// Offset the cron expressions are evaluated in
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Whether a schedule has a fire time within the last minute that has not
/// been executed yet.
fn is_due(
    schedule: &Schedule,
    offset: FixedOffset,
    last_exec: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let after = last_exec.unwrap_or_else(|| now - chrono::Duration::hours(1));

    for scheduled in schedule.after(&after.with_timezone(&offset)).take(10) {
        let scheduled = scheduled.with_timezone(&Utc);
        if scheduled > now {
            break;
        }
        if now.signed_duration_since(scheduled) < chrono::Duration::seconds(60) {
            if let Some(last) = last_exec {
                if last >= scheduled {
                    continue;
                }
            }
            return true;
        }
    }

    false
}

/// Delay before retrying after the given failed attempt (1-based).
fn retry_backoff_ms(attempt: u32) -> u64 {
    let doublings = attempt.saturating_sub(1).min(MAX_BACKOFF_DOUBLINGS);
    1000u64.saturating_mul(1u64 << doublings)
}
