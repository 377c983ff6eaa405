//! Static catalog of tracked FRED series.
//!
//! Every indicator the service knows about is a variant of [`Indicator`].
//! Adding one means adding a variant, a row in `SPECS`, and an arm in every
//! exhaustive match that dispatches on it (interpretation, for example).

use serde::Serialize;

use econ_common::config::FredConfig;
use econ_common::{Error, Result};

// ============================================================================
// Indicator
// ============================================================================

/// A tracked economic indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Indicator {
    FedFundsRate,
    Treasury10Y,
    Treasury2Y,
    YieldSpread,
    Unemployment,
    NonfarmPayrolls,
    JoblessClaims,
    LaborParticipation,
    Cpi,
    CoreCpi,
    PcePrices,
    Ppi,
    ImportPrices,
    ExportPrices,
    RealGdp,
    RetailSales,
    IndustrialProduction,
    IsmManufacturing,
    IsmServices,
    DurableGoods,
    NewOrders,
    HousingStarts,
    Mortgage30Y,
    ConsumerSentiment,
    SahmRule,
    ChicagoFedActivity,
}

impl Indicator {
    /// All indicators in report order.
    pub const ALL: [Indicator; 26] = [
        Self::FedFundsRate,
        Self::Treasury10Y,
        Self::Treasury2Y,
        Self::YieldSpread,
        Self::Unemployment,
        Self::NonfarmPayrolls,
        Self::JoblessClaims,
        Self::LaborParticipation,
        Self::Cpi,
        Self::CoreCpi,
        Self::PcePrices,
        Self::Ppi,
        Self::ImportPrices,
        Self::ExportPrices,
        Self::RealGdp,
        Self::RetailSales,
        Self::IndustrialProduction,
        Self::IsmManufacturing,
        Self::IsmServices,
        Self::DurableGoods,
        Self::NewOrders,
        Self::HousingStarts,
        Self::Mortgage30Y,
        Self::ConsumerSentiment,
        Self::SahmRule,
        Self::ChicagoFedActivity,
    ];

    /// Static description of this indicator.
    pub fn spec(self) -> &'static IndicatorSpec {
        &SPECS[self as usize]
    }

    /// FRED series id.
    pub fn code(self) -> &'static str {
        self.spec().code
    }

    pub fn display_name(self) -> &'static str {
        self.spec().display_name
    }

    /// Look up an indicator by FRED series id (case-insensitive).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ind| ind.code().eq_ignore_ascii_case(code.trim()))
    }
}

// ============================================================================
// Spec types
// ============================================================================

/// Which way an indicator has to move to become a concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    HigherIsWorse,
    LowerIsWorse,
}

/// Which movement counts as improvement in the daily summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Favorable {
    Falling,
    Rising,
}

/// Breakpoints in the same physical unit as the observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub critical: f64,
    pub warning: f64,
    pub normal: f64,
}

/// Report section an indicator is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    MonetaryPolicy,
    Employment,
    Inflation,
    Growth,
    BusinessActivity,
    Housing,
    Sentiment,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::MonetaryPolicy,
        Self::Employment,
        Self::Inflation,
        Self::Growth,
        Self::BusinessActivity,
        Self::Housing,
        Self::Sentiment,
    ];

    /// Section heading used in reports.
    pub fn heading(self) -> &'static str {
        match self {
            Self::MonetaryPolicy => "🏛️ Monetary Policy",
            Self::Employment => "💼 Labor Market",
            Self::Inflation => "💵 Inflation",
            Self::Growth => "📊 Economic Growth",
            Self::BusinessActivity => "🏭 Business Activity",
            Self::Housing => "🏠 Housing",
            Self::Sentiment => "🧭 Sentiment & Cycle",
        }
    }
}

/// Release cadence of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl Frequency {
    /// Shortest window that still holds two observations.
    pub fn min_lookback_days(self) -> i64 {
        match self {
            Self::Daily | Self::Weekly => 30,
            Self::Monthly => 100,
            Self::Quarterly => 200,
        }
    }
}

/// Physical unit, which decides how values are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    Percent,
    PercentPoint,
    ThousandPersons,
    Claims,
    ThousandUnits,
    BillionsUsd,
    MillionsUsd,
    Index,
}

impl Unit {
    /// Render a value in this unit.
    pub fn format(self, value: f64) -> String {
        use econ_common::util::group_thousands;

        match self {
            Self::Percent => format!("{value:.2}%"),
            Self::PercentPoint => format!("{value:.2}%p"),
            Self::ThousandPersons => format!("{}K persons", group_thousands(value.round() as i64)),
            Self::Claims => format!("{} claims", group_thousands(value.round() as i64)),
            Self::ThousandUnits => format!("{}K units", group_thousands(value.round() as i64)),
            Self::BillionsUsd => format!("${}B", group_thousands(value.round() as i64)),
            Self::MillionsUsd => format!("${}M", group_thousands(value.round() as i64)),
            Self::Index => format!("{value:.2}"),
        }
    }
}

/// Immutable description of one tracked series.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSpec {
    pub indicator: Indicator,
    pub code: &'static str,
    pub display_name: &'static str,
    pub unit: Unit,
    pub direction: Direction,
    pub favorable: Favorable,
    pub category: Category,
    pub frequency: Frequency,
    pub thresholds: Option<Thresholds>,
}

const fn th(critical: f64, warning: f64, normal: f64) -> Option<Thresholds> {
    Some(Thresholds {
        critical,
        warning,
        normal,
    })
}

macro_rules! spec {
    ($ind:ident, $code:literal, $name:literal, $unit:ident, $dir:ident, $fav:ident, $cat:ident, $freq:ident, $th:expr) => {
        IndicatorSpec {
            indicator: Indicator::$ind,
            code: $code,
            display_name: $name,
            unit: Unit::$unit,
            direction: Direction::$dir,
            favorable: Favorable::$fav,
            category: Category::$cat,
            frequency: Frequency::$freq,
            thresholds: $th,
        }
    };
}

/// Indexed by `Indicator as usize`; order must match the enum.
#[rustfmt::skip]
static SPECS: [IndicatorSpec; 26] = [
    spec!(FedFundsRate, "DFF", "Federal Funds Rate", Percent, HigherIsWorse, Rising, MonetaryPolicy, Daily, th(5.0, 4.0, 2.0)),
    spec!(Treasury10Y, "DGS10", "10-Year Treasury Yield", Percent, HigherIsWorse, Rising, MonetaryPolicy, Daily, None),
    spec!(Treasury2Y, "DGS2", "2-Year Treasury Yield", Percent, HigherIsWorse, Rising, MonetaryPolicy, Daily, None),
    spec!(YieldSpread, "T10Y2Y", "10Y-2Y Treasury Yield Spread", PercentPoint, LowerIsWorse, Rising, MonetaryPolicy, Daily, th(-0.5, 0.0, 1.0)),
    spec!(Unemployment, "UNRATE", "Unemployment Rate", Percent, HigherIsWorse, Falling, Employment, Monthly, th(5.0, 4.5, 3.5)),
    spec!(NonfarmPayrolls, "PAYEMS", "Nonfarm Payrolls", ThousandPersons, LowerIsWorse, Rising, Employment, Monthly, None),
    spec!(JoblessClaims, "ICSA", "Initial Jobless Claims", Claims, HigherIsWorse, Falling, Employment, Weekly, th(300_000.0, 250_000.0, 200_000.0)),
    spec!(LaborParticipation, "CIVPART", "Labor Force Participation Rate", Percent, LowerIsWorse, Rising, Employment, Monthly, None),
    spec!(Cpi, "CPIAUCSL", "Consumer Price Index", Index, HigherIsWorse, Falling, Inflation, Monthly, th(4.0, 3.0, 2.0)),
    spec!(CoreCpi, "CPILFESL", "Core CPI", Index, HigherIsWorse, Rising, Inflation, Monthly, None),
    spec!(PcePrices, "PCEPI", "PCE Price Index", Index, HigherIsWorse, Rising, Inflation, Monthly, None),
    spec!(Ppi, "PPIACO", "Producer Price Index", Index, HigherIsWorse, Rising, Inflation, Monthly, th(5.0, 3.5, 2.0)),
    spec!(ImportPrices, "IR", "Import Price Index", Index, HigherIsWorse, Rising, Inflation, Monthly, None),
    spec!(ExportPrices, "IQ", "Export Price Index", Index, HigherIsWorse, Rising, Inflation, Monthly, None),
    spec!(RealGdp, "GDPC1", "Real GDP", BillionsUsd, LowerIsWorse, Rising, Growth, Quarterly, None),
    spec!(RetailSales, "RSXFS", "Retail Sales", MillionsUsd, LowerIsWorse, Rising, Growth, Monthly, None),
    spec!(IndustrialProduction, "INDPRO", "Industrial Production Index", Index, LowerIsWorse, Rising, Growth, Monthly, None),
    spec!(IsmManufacturing, "MANEMP", "ISM Manufacturing Index", Index, LowerIsWorse, Rising, BusinessActivity, Monthly, th(45.0, 48.0, 50.0)),
    spec!(IsmServices, "NMFBAI", "ISM Services Index", Index, LowerIsWorse, Rising, BusinessActivity, Monthly, th(45.0, 48.0, 50.0)),
    spec!(DurableGoods, "DGORDER", "Durable Goods Orders", MillionsUsd, LowerIsWorse, Rising, BusinessActivity, Monthly, None),
    spec!(NewOrders, "NEWORDER", "Manufacturing New Orders", MillionsUsd, LowerIsWorse, Rising, BusinessActivity, Monthly, None),
    spec!(HousingStarts, "HOUST", "Housing Starts", ThousandUnits, LowerIsWorse, Rising, Housing, Monthly, None),
    spec!(Mortgage30Y, "MORTGAGE30US", "30-Year Mortgage Rate", Percent, HigherIsWorse, Rising, Housing, Weekly, None),
    spec!(ConsumerSentiment, "UMCSENT", "Michigan Consumer Sentiment", Index, LowerIsWorse, Rising, Sentiment, Monthly, None),
    spec!(SahmRule, "SAHMREALTIME", "Sahm Rule Recession Indicator", PercentPoint, HigherIsWorse, Rising, Sentiment, Monthly, th(0.5, 0.3, 0.1)),
    spec!(ChicagoFedActivity, "CFNAI", "Chicago Fed National Activity Index", Index, LowerIsWorse, Rising, Sentiment, Monthly, None),
];

// ============================================================================
// Catalog
// ============================================================================

/// The set of indicators one service instance tracks.
#[derive(Debug, Clone)]
pub struct IndicatorCatalog {
    indicators: Vec<Indicator>,
}

impl IndicatorCatalog {
    /// Every known indicator.
    pub fn standard() -> Self {
        Self {
            indicators: Indicator::ALL.to_vec(),
        }
    }

    /// A catalog restricted to the given codes, kept in report order.
    pub fn with_codes<S: AsRef<str>>(codes: &[S]) -> Result<Self> {
        let mut selected = Vec::with_capacity(codes.len());
        for code in codes {
            let code = code.as_ref();
            let indicator = Indicator::from_code(code)
                .ok_or_else(|| Error::InvalidInput(format!("unknown indicator code: {code}")))?;
            if !selected.contains(&indicator) {
                selected.push(indicator);
            }
        }
        selected.sort_by_key(|ind| *ind as usize);
        Ok(Self {
            indicators: selected,
        })
    }

    /// Build from the `fred.indicators` setting; empty means everything.
    pub fn from_config(config: &FredConfig) -> Result<Self> {
        if config.indicators.is_empty() {
            Ok(Self::standard())
        } else {
            Self::with_codes(&config.indicators)
        }
    }

    /// Spec for a tracked code. Codes outside this catalog return `None`.
    pub fn get(&self, code: &str) -> Option<&'static IndicatorSpec> {
        Indicator::from_code(code)
            .filter(|ind| self.indicators.contains(ind))
            .map(Indicator::spec)
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.indicators.iter().map(|ind| ind.code()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static IndicatorSpec> + '_ {
        self.indicators.iter().map(|ind| ind.spec())
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}

impl Default for IndicatorCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
