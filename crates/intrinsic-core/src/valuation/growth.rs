use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

/// Growth rate used for the explicit projection and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum GrowthEstimate {
    /// CAGR of the filtered history
    Historical { rate: Rate },
    /// Supplied by the user; history was not consulted
    Override { rate: Rate },
    /// CAGR undefined (short history or non-positive endpoints); the
    /// projection is flat
    Undetermined,
}

impl GrowthEstimate {
    /// The rate to project with, `None` meaning flat.
    pub fn rate(&self) -> Option<Rate> {
        match self {
            GrowthEstimate::Historical { rate } | GrowthEstimate::Override { rate } => Some(*rate),
            GrowthEstimate::Undetermined => None,
        }
    }

    pub fn is_undetermined(&self) -> bool {
        matches!(self, GrowthEstimate::Undetermined)
    }
}

/// Compound annual growth rate `(last/first)^(1/(n-1)) - 1`.
///
/// Returns `None` for fewer than two values or a non-positive first or last
/// value.
pub fn calculate_cagr(values: &[Money]) -> Option<Rate> {
    if values.len() < 2 {
        return None;
    }
    let first = *values.first()?;
    let last = *values.last()?;
    if first <= Decimal::ZERO || last <= Decimal::ZERO {
        return None;
    }

    let periods = Decimal::from((values.len() - 1) as u64);
    let ratio = last / first;
    let growth = ratio.checked_powd(Decimal::ONE / periods)?;
    Some(growth - Decimal::ONE)
}

/// Resolve the projection growth rate. A user override always wins.
pub fn estimate_growth(values: &[Money], user_override: Option<Rate>) -> GrowthEstimate {
    if let Some(rate) = user_override {
        return GrowthEstimate::Override { rate };
    }
    match calculate_cagr(values) {
        Some(rate) => GrowthEstimate::Historical { rate },
        None => GrowthEstimate::Undetermined,
    }
}
