//! Rule-based analysis of an indicator snapshot.
//!
//! ```text
//! Snapshot ──► classify (per indicator) ──► alerts ──┐
//!     │                                               ├──► recommend ──► AnalysisResult
//!     └──────► judge (phase, risk on raw values) ─────┘
//! ```
//!
//! Everything here is pure: the same snapshot and timestamp always produce
//! the same [`AnalysisResult`].

mod classifier;
mod critical;
mod judge;
mod recommend;

pub use classifier::{classify, interpret};
pub use critical::critical_alerts;
pub use judge::{
    calculate_risk, determine_phase, matched_phase_rule, MacroReadings, PhaseRule, RiskBreakdown,
    PHASE_RULES,
};
pub use recommend::{recommend, MAX_RECOMMENDATIONS};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{Favorable, Indicator};
use crate::data::{Change, Snapshot};

// ============================================================================
// Assessment Types
// ============================================================================

/// How far an indicator has moved from its safe range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SeverityTier {
    Normal,
    Warning,
    Critical,
}

impl SeverityTier {
    pub fn is_alert(self) -> bool {
        self != Self::Normal
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Direction of the latest move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    /// Classify a percent change; moves under half a percent are flat.
    pub fn from_percent(percent: f64) -> Self {
        let percent = if percent.is_finite() { percent } else { 0.0 };
        if percent.abs() < 0.5 {
            Self::Flat
        } else if percent > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Self::Up => "↗️",
            Self::Down => "↘️",
            Self::Flat => "→",
        }
    }
}

/// Classification of one indicator for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorAssessment {
    pub code: String,
    /// Display name, or the code itself for unknown series
    pub name: String,
    pub current_value: f64,
    pub change: Option<Change>,
    pub tier: SeverityTier,
    pub trend: Trend,
    pub interpretation: &'static str,
}

impl IndicatorAssessment {
    /// Arrow to render, if there was a previous value to compare against.
    pub fn trend_arrow(&self) -> Option<&'static str> {
        self.change.map(|_| self.trend.arrow())
    }
}

/// A Warning or Critical assessment surfaced in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub code: String,
    /// Indicator display name; recommendation markers match against it
    pub indicator: String,
    pub tier: SeverityTier,
    pub value: f64,
    pub message: &'static str,
}

// ============================================================================
// Composite Labels
// ============================================================================

/// Coarse macro regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarketPhase {
    Recession,
    Slowdown,
    Overheating,
    Expansion,
    ModerateGrowth,
    Transition,
}

impl MarketPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Recession => "Recession",
            Self::Slowdown => "Slowdown",
            Self::Overheating => "Overheating",
            Self::Expansion => "Expansion",
            Self::ModerateGrowth => "Moderate Growth",
            Self::Transition => "Transition",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Recession => "🔴",
            Self::Slowdown => "🟠",
            Self::Overheating => "🟡",
            Self::Expansion => "🟢",
            Self::ModerateGrowth => "🔵",
            Self::Transition => "⚪",
        }
    }
}

/// Aggregate market stress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskTier {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskTier {
    /// Tier for a 0-100 risk percentage.
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            70.. => Self::VeryHigh,
            50..=69 => Self::High,
            30..=49 => Self::Medium,
            15..=29 => Self::Low,
            _ => Self::VeryLow,
        }
    }

    pub fn is_elevated(self) -> bool {
        matches!(self, Self::High | Self::VeryHigh)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::VeryLow => "🔵",
            Self::Low => "🟢",
            Self::Medium => "🟡",
            Self::High => "🟠",
            Self::VeryHigh => "🔴",
        }
    }
}

/// Risk score with its tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    /// Points out of 10
    pub score: u8,
    /// `score / 10 * 100`
    pub percent: u8,
    pub tier: RiskTier,
    pub breakdown: RiskBreakdown,
}

/// Counts and names for the report header.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Requested indicators, fetched or not
    pub total: usize,
    /// Indicators with an observation this cycle
    pub updated: usize,
    pub critical: Vec<String>,
    pub improving: Vec<String>,
    pub deteriorating: Vec<String>,
}

/// Output of one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub timestamp: DateTime<Utc>,
    /// One entry per observation, in snapshot order
    pub assessments: Vec<IndicatorAssessment>,
    pub alerts: Vec<Alert>,
    pub market_phase: MarketPhase,
    pub risk: RiskAssessment,
    pub recommendations: Vec<String>,
    pub summary: Summary,
}

impl AnalysisResult {
    pub fn assessment(&self, code: &str) -> Option<&IndicatorAssessment> {
        self.assessments.iter().find(|a| a.code == code)
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Analyze a snapshot, stamped with the current time.
pub fn analyze(snapshot: &Snapshot) -> AnalysisResult {
    analyze_at(snapshot, Utc::now())
}

/// Analyze a snapshot with an explicit timestamp.
pub fn analyze_at(snapshot: &Snapshot, timestamp: DateTime<Utc>) -> AnalysisResult {
    let assessments: Vec<IndicatorAssessment> = snapshot
        .observations
        .iter()
        .map(|obs| classify(&obs.code, obs.value, obs.change.as_ref()))
        .collect();

    let alerts: Vec<Alert> = assessments
        .iter()
        .filter(|a| a.tier.is_alert())
        .map(|a| Alert {
            code: a.code.clone(),
            indicator: a.name.clone(),
            tier: a.tier,
            value: a.current_value,
            message: a.interpretation,
        })
        .collect();

    let market_phase = determine_phase(snapshot);
    let risk = calculate_risk(snapshot);
    let recommendations = recommend(market_phase, risk.tier, &alerts);
    let summary = summarize(snapshot, &assessments);

    AnalysisResult {
        timestamp,
        assessments,
        alerts,
        market_phase,
        risk,
        recommendations,
        summary,
    }
}

fn summarize(snapshot: &Snapshot, assessments: &[IndicatorAssessment]) -> Summary {
    let mut summary = Summary {
        total: snapshot.observations.len() + snapshot.missing.len(),
        updated: snapshot.observations.len(),
        ..Summary::default()
    };

    for assessment in assessments {
        if assessment.tier == SeverityTier::Critical {
            summary.critical.push(assessment.name.clone());
        }

        let Some(change) = assessment.change else {
            continue;
        };
        let pct = if change.percent.is_finite() { change.percent } else { 0.0 };

        let favorable = Indicator::from_code(&assessment.code)
            .map(|ind| ind.spec().favorable)
            .unwrap_or(Favorable::Rising);

        let (improving, deteriorating) = match favorable {
            Favorable::Falling => (pct < -1.0, pct > 1.0),
            Favorable::Rising => (pct > 1.0, pct < -1.0),
        };

        if improving {
            summary.improving.push(assessment.name.clone());
        } else if deteriorating {
            summary.deteriorating.push(assessment.name.clone());
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use chrono::{NaiveDate, TimeZone};

    fn obs(code: &str, value: f64, prev: Option<f64>) -> Observation {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        Observation::new(code, value, date).with_change(prev.and_then(|p| Change::between(p, value)))
    }

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 23, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_snapshot_yields_sparse_result() {
        let result = analyze_at(&Snapshot::default(), ts());

        assert!(result.assessments.is_empty());
        assert!(result.alerts.is_empty());
        assert_eq!(result.market_phase, MarketPhase::Transition);
        // Spread defaults to 1 (0 points); missing CPI reads as 0% inflation (2 points).
        assert_eq!(result.risk.score, 2);
        assert_eq!(result.risk.tier, RiskTier::Low);
        assert!(result.recommendations.is_empty());
        assert_eq!(result.summary.total, 0);
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let snapshot = Snapshot::new(vec![
            obs("T10Y2Y", -0.6, Some(-0.5)),
            obs("UNRATE", 4.2, Some(4.0)),
            obs("SAHMREALTIME", 0.35, Some(0.3)),
        ]);
        assert_eq!(analyze_at(&snapshot, ts()), analyze_at(&snapshot, ts()));
    }

    #[test]
    fn test_alerts_follow_snapshot_order() {
        let snapshot = Snapshot::new(vec![
            obs("UNRATE", 5.1, None),
            obs("DFF", 3.0, None),
            obs("T10Y2Y", -0.2, None),
        ]);
        let result = analyze_at(&snapshot, ts());

        let codes: Vec<_> = result.alerts.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["UNRATE", "T10Y2Y"]);
        assert_eq!(result.alerts[0].tier, SeverityTier::Critical);
        assert_eq!(result.alerts[1].tier, SeverityTier::Warning);
        assert_eq!(result.alerts[1].indicator, "10Y-2Y Treasury Yield Spread");
        assert_eq!(result.summary.critical, vec!["Unemployment Rate"]);
    }

    #[test]
    fn test_slowdown_scenario() {
        let snapshot = Snapshot::new(vec![obs("T10Y2Y", -0.6, None), obs("UNRATE", 4.2, None)]);
        let result = analyze_at(&snapshot, ts());

        assert_eq!(result.market_phase, MarketPhase::Slowdown);
        assert_eq!(
            result.recommendations[..3],
            [
                "Time to rebalance the portfolio",
                "Consider raising dividend-stock weighting",
                "Consider trimming growth-stock exposure",
            ]
        );
    }

    #[test]
    fn test_small_moves_not_improving() {
        // Unemployment 3.0 with CPI +0.1%: no alert, nothing improving.
        let snapshot = Snapshot::new(vec![
            obs("UNRATE", 3.0, Some(3.0)),
            obs("CPIAUCSL", 300.3, Some(300.0)),
        ]);
        let result = analyze_at(&snapshot, ts());

        assert!(result.alerts.iter().all(|a| a.code != "UNRATE"));
        assert!(!result.summary.improving.contains(&"Unemployment Rate".to_string()));
        assert!(result.summary.improving.is_empty());
        assert!(result.summary.deteriorating.is_empty());
    }

    #[test]
    fn test_summary_is_direction_aware() {
        let snapshot = Snapshot {
            observations: vec![
                obs("UNRATE", 3.8, Some(4.0)),      // -5%, falling is good
                obs("ICSA", 260_000.0, Some(240_000.0)), // +8.3%, rising is bad
                obs("RSXFS", 710_000.0, Some(700_000.0)), // +1.4%, rising is good
                obs("HOUST", 1_300.0, Some(1_400.0)),   // -7.1%, falling is bad
                obs("DFF", 5.33, None),
            ],
            missing: vec!["GDPC1".into(), "PAYEMS".into()],
        };
        let result = analyze_at(&snapshot, ts());

        assert_eq!(result.summary.total, 7);
        assert_eq!(result.summary.updated, 5);
        assert_eq!(result.summary.improving, vec!["Unemployment Rate", "Retail Sales"]);
        assert_eq!(
            result.summary.deteriorating,
            vec!["Initial Jobless Claims", "Housing Starts"]
        );
    }

    #[test]
    fn test_unknown_code_is_assessed_as_normal() {
        let snapshot = Snapshot::new(vec![obs("XYZ", 1e9, Some(1.0))]);
        let result = analyze_at(&snapshot, ts());

        assert_eq!(result.assessments[0].tier, SeverityTier::Normal);
        assert_eq!(result.assessments[0].name, "XYZ");
        assert!(result.alerts.is_empty());
    }

    #[test]
    fn test_lowercase_codes_drive_judgement() {
        let snapshot = Snapshot::new(vec![obs("sahmrealtime", 0.6, None)]);
        let result = analyze_at(&snapshot, ts());

        assert_eq!(result.assessments[0].tier, SeverityTier::Critical);
        assert_eq!(result.alerts.len(), 1);
        assert_eq!(result.market_phase, MarketPhase::Recession);
        // sahm 3 + missing CPI 2
        assert_eq!(result.risk.score, 5);
    }

    #[test]
    fn test_risk_tier_bands() {
        assert_eq!(RiskTier::from_percent(100), RiskTier::VeryHigh);
        assert_eq!(RiskTier::from_percent(70), RiskTier::VeryHigh);
        assert_eq!(RiskTier::from_percent(60), RiskTier::High);
        assert_eq!(RiskTier::from_percent(30), RiskTier::Medium);
        assert_eq!(RiskTier::from_percent(20), RiskTier::Low);
        assert_eq!(RiskTier::from_percent(10), RiskTier::VeryLow);
    }

    #[test]
    fn test_trend_from_percent() {
        assert_eq!(Trend::from_percent(0.49), Trend::Flat);
        assert_eq!(Trend::from_percent(-0.49), Trend::Flat);
        assert_eq!(Trend::from_percent(0.5), Trend::Up);
        assert_eq!(Trend::from_percent(-0.5), Trend::Down);
        assert_eq!(Trend::from_percent(f64::NAN), Trend::Flat);
    }
}
