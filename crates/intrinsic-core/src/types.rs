use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 15x terminal FCF)
pub type Multiple = Decimal;

/// Reporting currency of the source financials
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    GBP,
    #[default]
    USD,
    EUR,
    CHF,
    JPY,
    CAD,
    AUD,
    HKD,
    SGD,
    Other(String),
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Other(code) => write!(f, "{code}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// One historical observation. `value` is `None` when the provider
/// reported nothing usable for the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalCashFlow {
    pub period: String,
    pub value: Option<Money>,
}

/// Chronologically ordered historical cash flows, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSeries {
    pub entries: Vec<HistoricalCashFlow>,
}

impl CashFlowSeries {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Money)>,
        S: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(period, value)| HistoricalCashFlow {
                    period: period.into(),
                    value: Some(value),
                })
                .collect(),
        }
    }

    /// Values that are present, in chronological order.
    pub fn valid_values(&self) -> Vec<Money> {
        self.entries.iter().filter_map(|e| e.value).collect()
    }

    /// Entries whose value is present.
    pub fn valid_entries(&self) -> impl Iterator<Item = (&str, Money)> {
        self.entries
            .iter()
            .filter_map(|e| e.value.map(|v| (e.period.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.value.is_none())
    }
}

/// A single period in a financial projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPeriod {
    pub year: u32,
    pub label: String,
    pub is_terminal: bool,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
