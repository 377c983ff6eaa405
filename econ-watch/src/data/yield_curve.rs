//! 10-year / 2-year Treasury yield curve status.

use chrono::NaiveDate;
use serde::Serialize;

use super::{round_to, SeriesPoint};

/// Number of paired observations in the trailing average.
const AVERAGE_WINDOW: usize = 30;

/// How deep the curve is inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveSeverity {
    None,
    Moderate,
    Severe,
}

/// Yield curve reading derived from the DGS10 and DGS2 series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldCurveStatus {
    pub ten_year: f64,
    pub two_year: f64,
    /// `ten_year - two_year` in percentage points
    pub spread: f64,
    /// Mean spread over up to 30 same-day pairs
    pub avg_spread_30d: f64,
    pub inverted: bool,
    pub severity: CurveSeverity,
    pub message: &'static str,
    pub date: NaiveDate,
}

impl YieldCurveStatus {
    /// Build from two newest-first series. `None` when either is empty.
    pub fn from_series(ten_year: &[SeriesPoint], two_year: &[SeriesPoint]) -> Option<Self> {
        let latest_10y = ten_year.first()?;
        let latest_2y = two_year.first()?;
        let spread = latest_10y.value - latest_2y.value;

        let paired: Vec<f64> = ten_year
            .iter()
            .filter_map(|ten| {
                two_year
                    .iter()
                    .find(|two| two.date == ten.date)
                    .map(|two| ten.value - two.value)
            })
            .take(AVERAGE_WINDOW)
            .collect();

        let avg_spread = if paired.is_empty() {
            spread
        } else {
            paired.iter().sum::<f64>() / paired.len() as f64
        };

        Some(Self {
            ten_year: round_to(latest_10y.value, 3),
            two_year: round_to(latest_2y.value, 3),
            spread: round_to(spread, 3),
            avg_spread_30d: round_to(avg_spread, 3),
            inverted: spread < 0.0,
            severity: severity_for(spread),
            message: message_for(spread),
            date: latest_10y.date,
        })
    }

    /// Inverted by more than half a point.
    pub fn is_severely_inverted(&self) -> bool {
        self.inverted && self.spread < -0.5
    }
}

fn severity_for(spread: f64) -> CurveSeverity {
    if spread < -0.5 {
        CurveSeverity::Severe
    } else if spread < 0.0 {
        CurveSeverity::Moderate
    } else {
        CurveSeverity::None
    }
}

fn message_for(spread: f64) -> &'static str {
    if spread < -1.0 {
        "🔴 Severe inversion (strong recession signal)"
    } else if spread < -0.5 {
        "🟠 Clear inversion (recession warning)"
    } else if spread < 0.0 {
        "🟡 Mild inversion (caution)"
    } else if spread < 0.5 {
        "⚠️ Flattening (slowdown signal)"
    } else if spread < 1.0 {
        "➡️ Normal range"
    } else {
        "✅ Normal (expansion)"
    }
}
