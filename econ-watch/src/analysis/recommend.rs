//! Investment hints derived from phase, risk tier and alerts.

use super::{Alert, MarketPhase, RiskTier, SeverityTier};

/// Upper bound on the list handed to the report.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// How many alerts are scanned for indicator-specific advice.
const ALERT_SCAN: usize = 2;

fn phase_advice(phase: MarketPhase) -> &'static [&'static str] {
    match phase {
        MarketPhase::Recession => &[
            "Increase cash allocation",
            "Favor defensive sectors (utilities, consumer staples)",
            "Consider adding long-duration Treasuries",
        ],
        MarketPhase::Slowdown => &[
            "Time to rebalance the portfolio",
            "Consider raising dividend-stock weighting",
            "Consider trimming growth-stock exposure",
        ],
        MarketPhase::Overheating => &[
            "Consider taking profits",
            "Tighten risk management",
            "Secure short-term liquidity",
        ],
        MarketPhase::Expansion => &[
            "Maintain or increase equity allocation",
            "Watch cyclical sectors",
            "Look for growth-stock opportunities",
        ],
        MarketPhase::ModerateGrowth | MarketPhase::Transition => &[],
    }
}

/// Advice for a critical alert, matched on the indicator's display name.
fn critical_advice(alert: &Alert) -> Option<&'static str> {
    if alert.tier != SeverityTier::Critical {
        return None;
    }
    if alert.indicator.contains("Sahm") {
        Some("Adjust positions for recession")
    } else if alert.indicator.contains("Yield") {
        Some("Yield curve inverted - stay defensive")
    } else if alert.indicator.contains("ISM") {
        Some("Manufacturing/services contracting - avoid cyclicals")
    } else {
        None
    }
}

/// Build the recommendation list, at most [`MAX_RECOMMENDATIONS`] entries.
pub fn recommend(phase: MarketPhase, risk: RiskTier, alerts: &[Alert]) -> Vec<String> {
    let mut items: Vec<&'static str> = phase_advice(phase).to_vec();

    if risk.is_elevated() {
        items.push("Avoid leveraged positions");
        items.push("Build hedge positions");
    }

    items.extend(alerts.iter().take(ALERT_SCAN).filter_map(critical_advice));

    if alerts.iter().any(|a| a.indicator.contains("ISM")) {
        items.push("ISM below 50 - prepare for slowdown");
    }

    let mut unique: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.iter().any(|existing| existing == item) {
            unique.push(item.to_string());
        }
    }
    unique.truncate(MAX_RECOMMENDATIONS);
    unique
}
