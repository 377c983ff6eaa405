//! Market phase and risk score, computed from raw snapshot values.
//!
//! Both read the snapshot directly instead of per-indicator tiers. Missing
//! inputs fall back to fixed defaults: phase rules treat every missing
//! reading as 0, the risk score treats a missing spread as 1.

use serde::Serialize;

use crate::data::Snapshot;

use super::{MarketPhase, RiskAssessment, RiskTier};

/// Maximum risk score.
const MAX_SCORE: u8 = 10;

/// Raw readings the composite rules look at.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacroReadings {
    pub sahm: Option<f64>,
    pub spread: Option<f64>,
    pub unemployment: Option<f64>,
    /// GDP quarter-over-quarter percent times 4
    pub gdp_annualized: Option<f64>,
    /// CPI month-over-month percent times 12
    pub inflation_annualized: Option<f64>,
}

impl MacroReadings {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            sahm: finite(snapshot.value("SAHMREALTIME")),
            spread: finite(snapshot.value("T10Y2Y")),
            unemployment: finite(snapshot.value("UNRATE")),
            gdp_annualized: finite(snapshot.percent_change("GDPC1")).map(|p| p * 4.0),
            inflation_annualized: finite(snapshot.percent_change("CPIAUCSL")).map(|p| p * 12.0),
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

// ============================================================================
// Market Phase
// ============================================================================

/// One row of the phase decision list.
pub struct PhaseRule {
    pub name: &'static str,
    pub phase: MarketPhase,
    pub matches: fn(&MacroReadings) -> bool,
}

/// Checked in order; the first match wins, `Transition` otherwise.
pub static PHASE_RULES: [PhaseRule; 5] = [
    PhaseRule {
        name: "sahm_triggered",
        phase: MarketPhase::Recession,
        matches: |r| r.sahm.unwrap_or(0.0) >= 0.5,
    },
    PhaseRule {
        name: "inverted_curve_rising_unemployment",
        phase: MarketPhase::Slowdown,
        matches: |r| r.spread.unwrap_or(0.0) < 0.0 && r.unemployment.unwrap_or(0.0) > 4.0,
    },
    PhaseRule {
        name: "hot_growth_tight_labor",
        phase: MarketPhase::Overheating,
        matches: |r| r.gdp_annualized.unwrap_or(0.0) > 3.0 && r.unemployment.unwrap_or(0.0) < 3.5,
    },
    PhaseRule {
        name: "solid_growth",
        phase: MarketPhase::Expansion,
        matches: |r| r.gdp_annualized.unwrap_or(0.0) > 2.0 && r.unemployment.unwrap_or(0.0) < 4.0,
    },
    PhaseRule {
        name: "moderate_growth",
        phase: MarketPhase::ModerateGrowth,
        matches: |r| {
            let gdp = r.gdp_annualized.unwrap_or(0.0);
            gdp > 0.0 && gdp <= 2.0
        },
    },
];

/// The first matching rule, if any.
pub fn matched_phase_rule(readings: &MacroReadings) -> Option<&'static PhaseRule> {
    PHASE_RULES.iter().find(|rule| (rule.matches)(readings))
}

pub fn determine_phase(snapshot: &Snapshot) -> MarketPhase {
    let readings = MacroReadings::from_snapshot(snapshot);
    match matched_phase_rule(&readings) {
        Some(rule) => {
            tracing::debug!(rule = rule.name, phase = rule.phase.label(), "Phase rule matched");
            rule.phase
        }
        None => MarketPhase::Transition,
    }
}

// ============================================================================
// Risk Score
// ============================================================================

/// Points contributed by each input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskBreakdown {
    pub spread: u8,
    pub sahm: u8,
    pub unemployment: u8,
    pub inflation: u8,
}

impl RiskBreakdown {
    pub fn from_readings(readings: &MacroReadings) -> Self {
        let spread = readings.spread.unwrap_or(1.0);
        let sahm = readings.sahm.unwrap_or(0.0);
        let unemployment = readings.unemployment.unwrap_or(0.0);
        let inflation = readings.inflation_annualized.unwrap_or(0.0);

        Self {
            spread: match spread {
                s if s < -0.5 => 3,
                s if s < 0.0 => 2,
                s if s < 0.5 => 1,
                _ => 0,
            },
            sahm: match sahm {
                s if s >= 0.5 => 3,
                s if s >= 0.3 => 2,
                s if s >= 0.2 => 1,
                _ => 0,
            },
            unemployment: match unemployment {
                u if u > 5.0 => 2,
                u if u > 4.0 => 1,
                _ => 0,
            },
            inflation: match inflation {
                i if i > 4.0 || i < 1.0 => 2,
                i if i > 3.0 || i < 1.5 => 1,
                _ => 0,
            },
        }
    }

    pub fn total(&self) -> u8 {
        (self.spread + self.sahm + self.unemployment + self.inflation).min(MAX_SCORE)
    }
}

pub fn calculate_risk(snapshot: &Snapshot) -> RiskAssessment {
    let breakdown = RiskBreakdown::from_readings(&MacroReadings::from_snapshot(snapshot));
    let score = breakdown.total();
    let percent = score * (100 / MAX_SCORE);

    RiskAssessment {
        score,
        percent,
        tier: RiskTier::from_percent(percent),
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Change, Observation};
    use chrono::NaiveDate;
    use test_case::test_case;

    fn snapshot(values: &[(&str, f64, Option<f64>)]) -> Snapshot {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        Snapshot::new(
            values
                .iter()
                .map(|(code, value, prev)| {
                    Observation::new(*code, *value, date)
                        .with_change(prev.and_then(|p| Change::between(p, *value)))
                })
                .collect(),
        )
    }

    #[test]
    fn test_slowdown() {
        let s = snapshot(&[("T10Y2Y", -0.6, None), ("UNRATE", 4.2, None)]);
        assert_eq!(determine_phase(&s), MarketPhase::Slowdown);
    }

    #[test]
    fn test_recession_takes_precedence() {
        let s = snapshot(&[
            ("SAHMREALTIME", 0.5, None),
            ("T10Y2Y", -0.6, None),
            ("UNRATE", 4.2, None),
        ]);
        assert_eq!(determine_phase(&s), MarketPhase::Recession);
    }

    #[test]
    fn test_overheating_and_expansion() {
        // GDP +1% q/q = 4% annualized
        let hot = snapshot(&[("GDPC1", 101.0, Some(100.0)), ("UNRATE", 3.4, None)]);
        assert_eq!(determine_phase(&hot), MarketPhase::Overheating);

        let steady = snapshot(&[("GDPC1", 101.0, Some(100.0)), ("UNRATE", 3.8, None)]);
        assert_eq!(determine_phase(&steady), MarketPhase::Expansion);
    }

    #[test]
    fn test_moderate_growth_boundary() {
        // 0.5% q/q is exactly 2% annualized: not Expansion, still ModerateGrowth.
        let s = snapshot(&[("GDPC1", 100.5, Some(100.0)), ("UNRATE", 3.8, None)]);
        assert_eq!(determine_phase(&s), MarketPhase::ModerateGrowth);
    }

    #[test]
    fn test_transition_when_nothing_matches() {
        assert_eq!(determine_phase(&Snapshot::default()), MarketPhase::Transition);

        let contraction = snapshot(&[("GDPC1", 99.0, Some(100.0))]);
        assert_eq!(determine_phase(&contraction), MarketPhase::Transition);
    }

    #[test]
    fn test_rule_table_order() {
        let names: Vec<_> = PHASE_RULES.iter().map(|r| r.phase).collect();
        assert_eq!(
            names,
            vec![
                MarketPhase::Recession,
                MarketPhase::Slowdown,
                MarketPhase::Overheating,
                MarketPhase::Expansion,
                MarketPhase::ModerateGrowth,
            ]
        );
    }

    #[test]
    fn test_maximum_risk() {
        let s = snapshot(&[
            ("T10Y2Y", -0.6, None),
            ("SAHMREALTIME", 0.5, None),
            ("UNRATE", 5.5, None),
            ("CPIAUCSL", 100.4, Some(100.0)),
        ]);
        let risk = calculate_risk(&s);

        assert_eq!(risk.score, 10);
        assert_eq!(risk.percent, 100);
        assert_eq!(risk.tier, RiskTier::VeryHigh);
        assert_eq!(
            risk.breakdown,
            RiskBreakdown {
                spread: 3,
                sahm: 3,
                unemployment: 2,
                inflation: 2,
            }
        );
    }

    #[test]
    fn test_missing_inputs_use_safe_defaults() {
        let risk = calculate_risk(&Snapshot::default());
        assert_eq!(risk.breakdown.spread, 0);
        assert_eq!(risk.breakdown.sahm, 0);
        assert_eq!(risk.breakdown.unemployment, 0);
        // 0% annualized inflation is below 1%
        assert_eq!(risk.breakdown.inflation, 2);
    }

    #[test_case(-0.6, 3)]
    #[test_case(-0.1, 2)]
    #[test_case(0.2, 1)]
    #[test_case(0.5, 0)]
    fn test_spread_points(spread: f64, points: u8) {
        let s = snapshot(&[("T10Y2Y", spread, None)]);
        assert_eq!(calculate_risk(&s).breakdown.spread, points);
    }

    #[test_case(0.4, 2 ; "4.8 annualized")]
    #[test_case(0.3, 1 ; "3.6 annualized")]
    #[test_case(0.2, 0 ; "2.4 annualized")]
    #[test_case(0.1, 1 ; "1.2 annualized")]
    #[test_case(0.05, 2 ; "0.6 annualized")]
    fn test_inflation_points(monthly: f64, points: u8) {
        let s = snapshot(&[("CPIAUCSL", 100.0 + monthly, Some(100.0))]);
        assert_eq!(calculate_risk(&s).breakdown.inflation, points);
    }
}
