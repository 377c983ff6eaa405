//! Hourly check for conditions that warrant an immediate message.

use econ_common::util::group_thousands;

use crate::data::YieldCurveStatus;

/// Weekly claims above this are reported immediately.
const CLAIMS_SURGE: f64 = 300_000.0;

/// Sahm readings at or above this are reported immediately.
const SAHM_WARNING: f64 = 0.3;

/// Alert lines for the hourly check, in fixed order. Empty means all clear.
pub fn critical_alerts(
    jobless_claims: Option<f64>,
    sahm: Option<f64>,
    curve: Option<&YieldCurveStatus>,
) -> Vec<String> {
    let mut alerts = Vec::new();

    if let Some(claims) = jobless_claims.filter(|c| c.is_finite() && *c > CLAIMS_SURGE) {
        alerts.push(format!(
            "📈 Jobless claims surging: {} claims",
            group_thousands(claims.round() as i64)
        ));
    }

    if let Some(sahm) = sahm.filter(|s| s.is_finite() && *s >= SAHM_WARNING) {
        alerts.push(format!("⚠️ Sahm Rule warning: {sahm:.2}"));
    }

    if let Some(curve) = curve.filter(|c| c.is_severely_inverted()) {
        alerts.push(format!("🔴 Severe yield curve inversion: {:.2}%p", curve.spread));
    }

    alerts
}
