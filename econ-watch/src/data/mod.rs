//! Indicator data: observation types and the sources that produce them.
//!
//! # Data Sources
//! - **FRED** (`fred`): St. Louis Fed REST API, one request per series
//!
//! A cycle works on a [`Snapshot`]: the latest observation of every series
//! that could be fetched, plus the codes that could not.

mod fred;
mod source;
mod yield_curve;

pub use fred::FredClient;
pub use source::{observation_from_series, DataSource, SourceError};
pub use yield_curve::{CurveSeverity, YieldCurveStatus};

use chrono::NaiveDate;
use serde::Serialize;

use crate::catalog::Indicator;

// ============================================================================
// Core Data Types
// ============================================================================

/// One dated value of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Movement since the previous observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Change {
    /// `latest - previous`, rounded to 4 decimals
    pub absolute: f64,
    /// `absolute / |previous| * 100`, rounded to 2 decimals
    pub percent: f64,
    pub previous: f64,
}

impl Change {
    /// Change from `previous` to `latest`. `None` when `previous` is zero.
    pub fn between(previous: f64, latest: f64) -> Option<Self> {
        if previous == 0.0 || !previous.is_finite() || !latest.is_finite() {
            return None;
        }
        let absolute = latest - previous;
        let percent = absolute / previous.abs() * 100.0;
        Some(Self {
            absolute: round_to(absolute, 4),
            percent: round_to(percent, 2),
            previous,
        })
    }
}

/// Latest value of one series, as fetched at the start of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub code: String,
    pub value: f64,
    pub observed_at: NaiveDate,
    pub change: Option<Change>,
}

impl Observation {
    pub fn new(code: impl Into<String>, value: f64, observed_at: NaiveDate) -> Self {
        Self {
            code: code.into(),
            value,
            observed_at,
            change: None,
        }
    }

    pub fn with_change(mut self, change: Option<Change>) -> Self {
        self.change = change;
        self
    }

    /// Percent change, if a previous value exists.
    pub fn percent_change(&self) -> Option<f64> {
        self.change.map(|c| c.percent)
    }
}

/// Everything fetched for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Observations in catalog order.
    pub observations: Vec<Observation>,
    /// Codes requested but unavailable this cycle.
    pub missing: Vec<String>,
}

impl Snapshot {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self {
            observations,
            missing: Vec::new(),
        }
    }

    /// Observation for a code, matched the same way the catalog resolves
    /// codes. Codes outside the catalog must match exactly.
    pub fn get(&self, code: &str) -> Option<&Observation> {
        match Indicator::from_code(code) {
            Some(indicator) => self
                .observations
                .iter()
                .find(|o| Indicator::from_code(&o.code) == Some(indicator)),
            None => self.observations.iter().find(|o| o.code == code),
        }
    }

    /// Latest value of a series.
    pub fn value(&self, code: &str) -> Option<f64> {
        self.get(code).map(|o| o.value)
    }

    /// Latest percent change of a series.
    pub fn percent_change(&self, code: &str) -> Option<f64> {
        self.get(code).and_then(Observation::percent_change)
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
