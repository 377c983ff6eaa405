//! Telegram HTML rendering of analysis results and service messages.

use chrono::{DateTime, FixedOffset, Utc};
use std::fmt::Write as _;

use econ_common::config::ScheduleConfig;
use econ_common::util::escape_html;
use econ_common::{Error, Result};

use crate::analysis::{AnalysisResult, IndicatorAssessment, SeverityTier};
use crate::catalog::{Category, Indicator};
use crate::data::YieldCurveStatus;

/// Number of recommendations shown in the daily report.
const REPORT_RECOMMENDATIONS: usize = 3;

/// Sahm reading that gets its own banner.
const SAHM_TRIGGER: f64 = 0.5;

/// Severity prefix for one-off service messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Success,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Info => "ℹ️",
            Self::Success => "✅",
            Self::Warning => "⚠️",
            Self::Critical => "🚨",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Renders reports in a fixed local timezone.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    offset: FixedOffset,
    tz_label: String,
}

impl ReportFormatter {
    pub fn new(utc_offset_hours: i32, tz_label: impl Into<String>) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!("invalid UTC offset: {utc_offset_hours} hours"))
        })?;
        Ok(Self {
            offset,
            tz_label: tz_label.into(),
        })
    }

    pub fn from_config(schedule: &ScheduleConfig) -> Result<Self> {
        Self::new(schedule.utc_offset_hours, schedule.timezone_label.clone())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    fn local(&self, at: DateTime<Utc>, fmt: &str) -> String {
        format!("{} {}", at.with_timezone(&self.offset).format(fmt), self.tz_label)
    }

    // ========================================================================
    // Daily Report
    // ========================================================================

    pub fn daily_report(&self, analysis: &AnalysisResult, curve: Option<&YieldCurveStatus>) -> String {
        let mut out = String::new();
        let summary = &analysis.summary;

        let _ = writeln!(out, "<b>📊 US Economic Indicators Daily Briefing</b>");
        let _ = writeln!(out, "<b>📅 {}</b>", self.local(analysis.timestamp, "%Y-%m-%d %H:%M"));
        out.push('\n');
        let _ = writeln!(out, "<b>🎯 Overview</b>");
        let _ = writeln!(
            out,
            "• Market phase: {} {}",
            analysis.market_phase.emoji(),
            analysis.market_phase.label()
        );
        let _ = writeln!(
            out,
            "• Risk level: {} {} ({}%)",
            analysis.risk.tier.emoji(),
            analysis.risk.tier.label(),
            analysis.risk.percent
        );
        let _ = write!(out, "• Updated: {}/{} indicators", summary.updated, summary.total);
        if !summary.improving.is_empty() {
            let _ = write!(out, "\n• Improving: {}", escape_html(&summary.improving.join(", ")));
        }
        if !summary.deteriorating.is_empty() {
            let _ = write!(
                out,
                "\n• Deteriorating: {}",
                escape_html(&summary.deteriorating.join(", "))
            );
        }

        out.push_str("\n\n<b>📈 Key Indicators</b>");
        for category in Category::ALL {
            let rows: Vec<String> = analysis
                .assessments
                .iter()
                .filter_map(|a| {
                    let indicator = Indicator::from_code(&a.code)?;
                    (indicator.spec().category == category).then(|| indicator_line(indicator, a))
                })
                .collect();
            if rows.is_empty() {
                continue;
            }
            let _ = write!(out, "\n\n<b>{}</b>", category.heading());
            for row in rows {
                out.push('\n');
                out.push_str(&row);
            }
        }

        if !analysis.alerts.is_empty() {
            out.push_str("\n\n<b>🚨 Alerts</b>");
            for alert in &analysis.alerts {
                let marker = match alert.tier {
                    SeverityTier::Critical => "🔴",
                    _ => "🟠",
                };
                let _ = write!(
                    out,
                    "\n{} {}: {}",
                    marker,
                    escape_html(&alert.indicator),
                    escape_html(alert.message)
                );
            }
        }

        if let Some(curve) = curve {
            out.push_str("\n\n<b>💹 Yield Curve</b>");
            let _ = write!(out, "\n• 10Y: {:.3}%", curve.ten_year);
            let _ = write!(out, "\n• 2Y: {:.3}%", curve.two_year);
            let _ = write!(
                out,
                "\n• Spread: {:.3}%p (30-day avg {:.3}%p)",
                curve.spread, curve.avg_spread_30d
            );
            let _ = write!(out, "\n• {}", curve.message);
            if curve.inverted {
                out.push_str("\n<b>⚠️ Warning: yield curve inverted!</b>");
                out.push_str("\n<i>Historically a leading recession indicator</i>");
            }
        }

        if let Some(sahm) = analysis
            .assessment("SAHMREALTIME")
            .map(|a| a.current_value)
            .filter(|v| *v >= SAHM_TRIGGER)
        {
            let _ = write!(out, "\n\n<b>🚨 Sahm Rule triggered: {sahm:.2}</b>");
            out.push_str("\n<i>Recession entry signal</i>");
        }

        if !analysis.recommendations.is_empty() {
            out.push_str("\n\n<b>💡 Investment Takeaways</b>");
            for rec in analysis.recommendations.iter().take(REPORT_RECOMMENDATIONS) {
                let _ = write!(out, "\n• {}", escape_html(rec));
            }
        }

        out.push_str("\n\n<b>📌 Info</b>");
        out.push_str("\n• Data: FRED (Federal Reserve Bank of St. Louis)");
        out
    }

    // ========================================================================
    // Service Messages
    // ========================================================================

    /// Urgent message for the hourly check.
    pub fn critical_alert(&self, alerts: &[String], at: DateTime<Utc>) -> String {
        let lines: Vec<String> = alerts.iter().map(|a| escape_html(a)).collect();
        format!(
            "🚨 <b>Economic Indicator Alert</b>\n\n{}\n\nTime: {}",
            lines.join("\n"),
            self.local(at, "%H:%M")
        )
    }

    /// Generic leveled message; `body` is escaped.
    pub fn alert(&self, level: AlertLevel, body: &str) -> String {
        format!("{} <b>{}</b>\n\n{}", level.emoji(), level.title(), escape_html(body))
    }

    pub fn failure_alert(&self, reason: &str) -> String {
        self.alert(
            AlertLevel::Critical,
            &format!("Daily report generation failed:\n{reason}"),
        )
    }

    pub fn test_message(&self) -> String {
        self.alert(AlertLevel::Info, "✅ Economic indicator bot test\nRunning normally.")
    }

    pub fn startup_message(&self, indicator_count: usize, schedule: &ScheduleConfig) -> String {
        let body = format!(
            "✅ Economic indicator bot online\n\n\
             📊 Tracked indicators: {}\n\
             ⏰ Daily report: {} ({})\n\
             🔍 Critical monitoring: {} ({})\n\n\
             Ready!",
            indicator_count,
            schedule.daily_report,
            self.tz_label,
            schedule.critical_check,
            self.tz_label
        );
        self.alert(AlertLevel::Success, &body)
    }
}

/// `• name: value change` for one assessment.
fn indicator_line(indicator: Indicator, assessment: &IndicatorAssessment) -> String {
    let spec = indicator.spec();
    let value = spec.unit.format(assessment.current_value);
    match assessment.change {
        Some(change) => format!(
            "• {}: {} {}",
            spec.display_name,
            value,
            change_marker(change.percent)
        ),
        None => format!("• {}: {}", spec.display_name, value),
    }
}

fn change_marker(percent: f64) -> String {
    if percent > 0.1 {
        format!("📈 +{percent:.1}%")
    } else if percent < -0.1 {
        format!("📉 {percent:.1}%")
    } else {
        "➡️ 0.0%".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_at;
    use crate::data::{Change, Observation, SeriesPoint, Snapshot};
    use chrono::{NaiveDate, TimeZone};

    fn formatter() -> ReportFormatter {
        ReportFormatter::new(9, "KST").unwrap()
    }

    fn observation(code: &str, value: f64, prev: Option<f64>) -> Observation {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        Observation::new(code, value, date).with_change(prev.and_then(|p| Change::between(p, value)))
    }

    fn analysis() -> AnalysisResult {
        let snapshot = Snapshot {
            observations: vec![
                observation("DFF", 5.33, Some(5.33)),
                observation("T10Y2Y", -0.6, Some(-0.5)),
                observation("UNRATE", 4.2, Some(4.0)),
                observation("ICSA", 231_000.0, None),
                observation("SAHMREALTIME", 0.53, Some(0.43)),
            ],
            missing: vec!["GDPC1".into()],
        };
        analyze_at(&snapshot, Utc.with_ymd_and_hms(2024, 6, 2, 23, 0, 0).unwrap())
    }

    #[test]
    fn test_daily_report_sections() {
        let report = formatter().daily_report(&analysis(), None);

        assert!(report.starts_with("<b>📊 US Economic Indicators Daily Briefing</b>"));
        assert!(report.contains("2024-06-03 08:00 KST"));
        assert!(report.contains("• Market phase: 🔴 Recession"));
        assert!(report.contains("• Updated: 5/6 indicators"));
        assert!(report.contains("<b>🏛️ Monetary Policy</b>"));
        assert!(report.contains("• Federal Funds Rate: 5.33% ➡️ 0.0%"));
        assert!(report.contains("• Unemployment Rate: 4.20% 📈 +5.0%"));
        assert!(report.contains("• Initial Jobless Claims: 231,000 claims"));
        assert!(report.contains("🚨 Sahm Rule triggered: 0.53"));
        assert!(report.contains("<b>💡 Investment Takeaways</b>"));
        assert!(report.ends_with("• Data: FRED (Federal Reserve Bank of St. Louis)"));
        assert!(!report.contains("<b>🏠 Housing</b>"));
        assert!(!report.contains("Yield Curve</b>"));
    }

    #[test]
    fn test_report_shows_three_recommendations() {
        let analysis = analysis();
        assert!(analysis.recommendations.len() > REPORT_RECOMMENDATIONS);

        let report = formatter().daily_report(&analysis, None);
        let section = report
            .split("<b>💡 Investment Takeaways</b>")
            .nth(1)
            .and_then(|s| s.split("\n\n").next())
            .unwrap();
        assert_eq!(section.lines().filter(|l| l.starts_with("• ")).count(), 3);
    }

    #[test]
    fn test_yield_curve_section() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let curve = YieldCurveStatus::from_series(
            &[SeriesPoint::new(date, 4.3)],
            &[SeriesPoint::new(date, 4.9)],
        )
        .unwrap();

        let report = formatter().daily_report(&analysis(), Some(&curve));
        assert!(report.contains("• 10Y: 4.300%"));
        assert!(report.contains("• Spread: -0.600%p"));
        assert!(report.contains("Warning: yield curve inverted!"));
    }

    #[test]
    fn test_change_marker() {
        assert_eq!(change_marker(2.345), "📈 +2.3%");
        assert_eq!(change_marker(-0.5), "📉 -0.5%");
        assert_eq!(change_marker(0.1), "➡️ 0.0%");
    }

    #[test]
    fn test_critical_alert_uses_local_time() {
        let at = Utc.with_ymd_and_hms(2024, 6, 3, 14, 5, 0).unwrap();
        let msg = formatter().critical_alert(&["⚠️ Sahm Rule warning: 0.35".to_string()], at);

        assert!(msg.starts_with("🚨 <b>Economic Indicator Alert</b>"));
        assert!(msg.contains("Sahm Rule warning: 0.35"));
        assert!(msg.ends_with("Time: 23:05 KST"));
    }

    #[test]
    fn test_failure_alert_escapes_reason() {
        let msg = formatter().failure_alert("no data <all series failed>");
        assert!(msg.starts_with("🚨 <b>CRITICAL</b>"));
        assert!(msg.contains("&lt;all series failed&gt;"));
    }

    #[test]
    fn test_startup_message() {
        let msg = formatter().startup_message(26, &ScheduleConfig::default());
        assert!(msg.contains("Tracked indicators: 26"));
        assert!(msg.contains("0 0 8 * * * (KST)"));
    }

    #[test]
    fn test_invalid_offset() {
        assert!(ReportFormatter::new(30, "X").is_err());
    }
}
