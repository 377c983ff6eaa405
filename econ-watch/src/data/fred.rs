//! FRED (Federal Reserve Economic Data) API client.
//!
//! API Documentation: https://fred.stlouisfed.org/docs/api/fred/series_observations.html
//!
//! One `GET /series/observations` per series, newest first. FRED encodes
//! missing values as `"."`; those points are dropped.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use econ_common::config::FredConfig;
use econ_common::util::sanitize_for_log;

use super::source::{DataSource, SourceError};
use super::SeriesPoint;
use crate::catalog::Indicator;

/// Maximum observations requested per series.
const OBSERVATION_LIMIT: u32 = 100;

/// Attempts per series when the error is recoverable.
const MAX_ATTEMPTS: u32 = 2;

/// Series used for the health check.
const HEALTH_SERIES: &str = "DFF";

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
    error_code: Option<i64>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_message: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// FRED API client.
pub struct FredClient {
    api_key: String,
    base_url: String,
    lookback_days: i64,
    request_delay: Duration,
    client: reqwest::Client,
}

impl FredClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>, config: &FredConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            lookback_days: config.lookback_days,
            request_delay: Duration::from_millis(config.request_delay_ms),
            client,
        }
    }

    /// Observation window start for a series ending today.
    fn window_start(&self, code: &str, end: NaiveDate) -> NaiveDate {
        let min_days = Indicator::from_code(code)
            .map(|ind| ind.spec().frequency.min_lookback_days())
            .unwrap_or(0);
        end - ChronoDuration::days(self.lookback_days.max(min_days))
    }

    async fn request_series(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ObservationsResponse, SourceError> {
        let url = format!("{}/series/observations", self.base_url);
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let limit = OBSERVATION_LIMIT.to_string();

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        debug!(url = %url, series_id = %code, start = %start, end = %end, "Calling FRED API");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("series_id", code),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start.as_str()),
                ("observation_end", end.as_str()),
                ("sort_order", "desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Network("Request timeout".into())
                } else if e.is_connect() {
                    SourceError::Network("Connection failed".into())
                } else {
                    SourceError::Network(sanitize_for_log(&e.to_string()))
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error_message)
                .unwrap_or_else(|| format!("HTTP {status}"));

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
                || message.contains("api_key")
            {
                return Err(SourceError::Auth(sanitize_for_log(&message)));
            }
            return Err(SourceError::Api(sanitize_for_log(&message)));
        }

        let parsed: ObservationsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse response: {e}")))?;

        if let Some(code) = parsed.error_code {
            let message = parsed
                .error_message
                .clone()
                .unwrap_or_else(|| format!("error code {code}"));
            return Err(SourceError::Api(sanitize_for_log(&message)));
        }

        Ok(parsed)
    }
}

/// Convert raw observations into newest-first points, dropping malformed rows.
fn parse_points(code: &str, raw: Vec<RawObservation>) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = raw
        .into_iter()
        .filter_map(|obs| {
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").ok();
            let value = obs.value.trim().parse::<f64>().ok().filter(|v| v.is_finite());
            match (date, value) {
                (Some(date), Some(value)) => Some(SeriesPoint::new(date, value)),
                _ => {
                    debug!(series_id = %code, date = %obs.date, value = %obs.value, "Skipping malformed observation");
                    None
                }
            }
        })
        .collect();

    points.sort_by(|a, b| b.date.cmp(&a.date));
    points
}

#[async_trait]
impl DataSource for FredClient {
    fn name(&self) -> &'static str {
        "fred"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        self.fetch_series(HEALTH_SERIES).await.map(|_| ())
    }

    async fn fetch_series(&self, code: &str) -> Result<Vec<SeriesPoint>, SourceError> {
        let end = Utc::now().date_naive();
        let start = self.window_start(code, end);

        let mut attempt = 1;
        let response = loop {
            match self.request_series(code, start, end).await {
                Ok(response) => break response,
                Err(e) if e.is_recoverable() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(series_id = %code, attempt, error = %e, "FRED request failed, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };
        let points = parse_points(code, response.observations);

        if points.is_empty() {
            tracing::warn!(series_id = %code, "FRED returned no usable observations");
        }

        Ok(points)
    }
}
