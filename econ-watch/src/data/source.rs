//! Data source abstraction.
//!
//! Defines the `DataSource` trait the report pipeline fetches through, so the
//! classifier and judge can be exercised without any network.

use async_trait::async_trait;
use thiserror::Error;

use super::{Change, Observation, SeriesPoint, Snapshot};
use crate::catalog::Indicator;

// ============================================================================
// Source Error
// ============================================================================

/// Errors from a data source.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Connection failed or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// API key rejected
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Rate limited")]
    RateLimited,

    /// The API answered with an error payload
    #[error("API error: {0}")]
    Api(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Series has no usable observations in the window
    #[error("No data for {0}")]
    NoData(String),
}

impl SourceError {
    /// Check if the error is worth retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited)
    }
}

// ============================================================================
// Data Source Trait
// ============================================================================

/// A provider of economic time series.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Source name for logs and health output (e.g., "fred")
    fn name(&self) -> &'static str;

    /// Lightweight availability check.
    async fn health_check(&self) -> Result<(), SourceError>;

    /// Fetch recent observations of one series, newest first.
    ///
    /// Malformed values are dropped, not reported as errors.
    async fn fetch_series(&self, code: &str) -> Result<Vec<SeriesPoint>, SourceError>;

    /// Fetch the latest observation of every code.
    ///
    /// Never fails as a whole: unknown codes, failed requests and empty series
    /// are listed in `Snapshot::missing`.
    async fn fetch_latest(&self, codes: &[&str]) -> Snapshot {
        let mut snapshot = Snapshot::default();
        let total = codes.len();

        for (idx, code) in codes.iter().enumerate() {
            let Some(indicator) = Indicator::from_code(code) else {
                tracing::warn!(code = %code, "Unknown indicator code, skipping");
                snapshot.missing.push((*code).to_string());
                continue;
            };

            tracing::debug!(
                source = self.name(),
                code = indicator.code(),
                progress = format!("{}/{}", idx + 1, total),
                "Fetching series"
            );

            match self.fetch_series(indicator.code()).await {
                Ok(points) => match observation_from_series(indicator.code(), &points) {
                    Some(observation) => snapshot.observations.push(observation),
                    None => {
                        tracing::warn!(code = indicator.code(), "Series has no usable observations");
                        snapshot.missing.push(indicator.code().to_string());
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        source = self.name(),
                        code = indicator.code(),
                        error = %e,
                        "Failed to fetch series"
                    );
                    snapshot.missing.push(indicator.code().to_string());
                }
            }
        }

        tracing::info!(
            source = self.name(),
            fetched = snapshot.observations.len(),
            total,
            "Snapshot collected"
        );

        snapshot
    }
}

/// Build the latest observation from a newest-first series.
///
/// Non-finite points are skipped. The change is derived from the two most
/// recent remaining points.
pub fn observation_from_series(code: &str, points: &[SeriesPoint]) -> Option<Observation> {
    let mut valid = points.iter().filter(|p| p.value.is_finite());
    let latest = valid.next()?;
    let change = valid
        .next()
        .and_then(|prev| Change::between(prev.value, latest.value));

    Some(Observation::new(code, latest.value, latest.date).with_change(change))
}
