//! Per-indicator threshold classification and interpretation text.

use crate::catalog::{Direction, Indicator, Thresholds};
use crate::data::Change;

use super::{IndicatorAssessment, SeverityTier, Trend};

/// Interpretation for series without a dedicated reading.
const PENDING: &str = "Analysis pending";

/// Classify one observation. Never fails: unknown codes and non-finite
/// values come back as `Normal`.
pub fn classify(code: &str, value: f64, change: Option<&Change>) -> IndicatorAssessment {
    let finite = value.is_finite();
    let percent = change
        .map(|c| c.percent)
        .filter(|p| p.is_finite())
        .unwrap_or(0.0);
    let trend = change.map_or(Trend::Flat, |_| Trend::from_percent(percent));

    let Some(indicator) = Indicator::from_code(code) else {
        return IndicatorAssessment {
            code: code.to_string(),
            name: code.to_string(),
            current_value: value,
            change: change.copied(),
            tier: SeverityTier::Normal,
            trend,
            interpretation: PENDING,
        };
    };

    let spec = indicator.spec();
    let tier = match spec.thresholds {
        Some(thresholds) if finite => tier_for(value, &thresholds, spec.direction),
        _ => SeverityTier::Normal,
    };
    let reading = if finite { value } else { 0.0 };

    IndicatorAssessment {
        code: spec.code.to_string(),
        name: spec.display_name.to_string(),
        current_value: value,
        change: change.copied(),
        tier,
        trend,
        interpretation: interpret(indicator, reading, percent),
    }
}

fn tier_for(value: f64, thresholds: &Thresholds, direction: Direction) -> SeverityTier {
    match direction {
        Direction::LowerIsWorse if value <= thresholds.critical => SeverityTier::Critical,
        Direction::LowerIsWorse if value <= thresholds.warning => SeverityTier::Warning,
        Direction::HigherIsWorse if value >= thresholds.critical => SeverityTier::Critical,
        Direction::HigherIsWorse if value >= thresholds.warning => SeverityTier::Warning,
        _ => SeverityTier::Normal,
    }
}

/// Human-readable reading of a value and its percent change.
pub fn interpret(indicator: Indicator, value: f64, percent: f64) -> &'static str {
    match indicator {
        Indicator::Unemployment => {
            if value < 3.5 {
                "Full employment - wage pressure building"
            } else if value < 4.0 {
                "Healthy labor market"
            } else if value < 5.0 {
                "Labor market cooling"
            } else {
                "Labor market deteriorating - recession risk"
            }
        }
        Indicator::Cpi => {
            let annual = percent * 12.0;
            if annual > 3.0 {
                "Inflation pressure rising"
            } else if annual > 2.0 {
                "Near the 2% target"
            } else if annual > 1.0 {
                "Stable price growth"
            } else {
                "Deflation concern"
            }
        }
        Indicator::Ppi => {
            let annual = percent * 12.0;
            if annual > 4.0 {
                "Producer prices surging - cost pressure intensifying"
            } else if annual > 3.0 {
                "Producer price pressure rising"
            } else if annual > 2.0 {
                "Producer prices rising moderately"
            } else {
                "Producer prices stable"
            }
        }
        Indicator::FedFundsRate => {
            if value >= 5.0 {
                "Restrictive monetary policy"
            } else if value >= 3.0 {
                "Neutral monetary policy"
            } else if value >= 1.0 {
                "Accommodative monetary policy"
            } else {
                "Ultra-accommodative monetary policy"
            }
        }
        Indicator::RealGdp => {
            let annual = percent * 4.0;
            if annual > 3.0 {
                "Strong economic growth"
            } else if annual > 2.0 {
                "Healthy growth"
            } else if annual > 0.0 {
                "Growth slowing"
            } else {
                "Economic contraction"
            }
        }
        Indicator::YieldSpread => {
            if value < -0.5 {
                "Deep inversion - recession imminent"
            } else if value < 0.0 {
                "Inverted curve - recession warning"
            } else if value < 0.5 {
                "Flattening - slowdown signal"
            } else {
                "Normal yield curve"
            }
        }
        Indicator::SahmRule => {
            if value >= 0.5 {
                "Recession underway (Sahm Rule triggered)"
            } else if value >= 0.3 {
                "Recession warning level"
            } else if value >= 0.2 {
                "Labor market weakening"
            } else {
                "Normal level"
            }
        }
        Indicator::JoblessClaims => {
            if value > 300_000.0 {
                "Claims surging - labor market deteriorating"
            } else if value > 250_000.0 {
                "Claims trending higher"
            } else if value > 200_000.0 {
                "Normal range"
            } else {
                "Low claims - strong labor market"
            }
        }
        Indicator::RetailSales => {
            if percent > 1.0 {
                "Strong consumer spending"
            } else if percent > 0.0 {
                "Consumer spending growing"
            } else if percent > -1.0 {
                "Consumer spending slowing"
            } else {
                "Consumer spending contracting"
            }
        }
        Indicator::HousingStarts => {
            if value > 1500.0 {
                "Housing boom"
            } else if value > 1300.0 {
                "Active home building"
            } else if value > 1100.0 {
                "Normal construction activity"
            } else {
                "Housing market slowing"
            }
        }
        Indicator::ConsumerSentiment => {
            if value > 100.0 {
                "Optimistic consumers"
            } else if value > 90.0 {
                "Positive consumer sentiment"
            } else if value > 80.0 {
                "Neutral consumer sentiment"
            } else {
                "Pessimistic consumers"
            }
        }
        Indicator::IsmManufacturing => {
            if value >= 60.0 {
                "Manufacturing expanding strongly"
            } else if value >= 55.0 {
                "Manufacturing expanding"
            } else if value >= 50.0 {
                "Manufacturing expanding modestly"
            } else if value >= 48.0 {
                "Manufacturing starting to contract"
            } else if value >= 45.0 {
                "Manufacturing contracting"
            } else {
                "Manufacturing contracting sharply"
            }
        }
        Indicator::IsmServices => {
            if value >= 60.0 {
                "Services expanding strongly"
            } else if value >= 55.0 {
                "Services expanding"
            } else if value >= 50.0 {
                "Services expanding modestly"
            } else if value >= 48.0 {
                "Services starting to contract"
            } else if value >= 45.0 {
                "Services contracting"
            } else {
                "Services contracting sharply"
            }
        }
        Indicator::ImportPrices => {
            if percent > 2.0 {
                "Import prices surging - inflation pressure"
            } else if percent > 1.0 {
                "Import prices rising"
            } else if percent > -1.0 {
                "Import prices stable"
            } else {
                "Import prices falling - deflation pressure"
            }
        }
        Indicator::ExportPrices => {
            if percent > 2.0 {
                "Export prices strong - competitiveness concern"
            } else if percent > 0.0 {
                "Export prices rising"
            } else if percent > -2.0 {
                "Export prices stable"
            } else {
                "Export prices weak - competitiveness improving"
            }
        }
        Indicator::Treasury10Y
        | Indicator::Treasury2Y
        | Indicator::NonfarmPayrolls
        | Indicator::LaborParticipation
        | Indicator::CoreCpi
        | Indicator::PcePrices
        | Indicator::IndustrialProduction
        | Indicator::DurableGoods
        | Indicator::NewOrders
        | Indicator::Mortgage30Y
        | Indicator::ChicagoFedActivity => PENDING,
    }
}
