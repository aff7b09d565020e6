use serde::{Deserialize, Serialize};

use crate::time_value::{checked_sum, compound, discount_cash_flows, discount_factor};
use crate::types::{Money, ProjectionPeriod, Rate};
use crate::IntrinsicResult;

/// One explicit forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedYear {
    pub period: ProjectionPeriod,
    pub cash_flow: Money,
    pub discount_factor: Rate,
    pub present_value: Money,
}

/// Explicit-period forecast, discounted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub years: Vec<ProjectedYear>,
    pub sum_of_present_values: Money,
    pub discount_rate: Rate,
}

impl ProjectionResult {
    pub fn cash_flows(&self) -> Vec<Money> {
        self.years.iter().map(|y| y.cash_flow).collect()
    }

    pub fn present_values(&self) -> Vec<Money> {
        self.years.iter().map(|y| y.present_value).collect()
    }

    pub fn last_cash_flow(&self) -> Option<Money> {
        self.years.last().map(|y| y.cash_flow)
    }

    pub fn horizon(&self) -> u32 {
        self.years.len() as u32
    }
}

/// Extend `last_cf` forward `years` times. Year `i` (1-indexed) is
/// `last_cf * (1+g)^i`; with no growth rate every year equals `last_cf`.
pub fn project_cash_flows(
    last_cf: Money,
    growth: Option<Rate>,
    years: u32,
) -> IntrinsicResult<Vec<Money>> {
    match growth {
        Some(g) => (1..=years).map(|i| compound(last_cf, g, i)).collect(),
        None => Ok(vec![last_cf; years as usize]),
    }
}

/// Project and discount in one pass.
///
/// Precondition: `discount_rate > -1`.
pub fn build_projection(
    last_cf: Money,
    growth: Option<Rate>,
    years: u32,
    discount_rate: Rate,
) -> IntrinsicResult<ProjectionResult> {
    let cash_flows = project_cash_flows(last_cf, growth, years)?;
    discount_projection(&cash_flows, discount_rate)
}

/// Discount an already projected sequence at `discount_rate`.
pub fn discount_projection(
    cash_flows: &[Money],
    discount_rate: Rate,
) -> IntrinsicResult<ProjectionResult> {
    let pvs = discount_cash_flows(cash_flows, discount_rate)?;

    let mut years = Vec::with_capacity(cash_flows.len());
    for (idx, (cf, pv)) in cash_flows.iter().zip(pvs.iter()).enumerate() {
        let year = idx as u32 + 1;
        years.push(ProjectedYear {
            period: ProjectionPeriod {
                year,
                label: format!("Year {year}"),
                is_terminal: false,
            },
            cash_flow: *cf,
            discount_factor: discount_factor(discount_rate, year)?,
            present_value: *pv,
        });
    }

    Ok(ProjectionResult {
        sum_of_present_values: checked_sum(&pvs, "sum of projected present values")?,
        years,
        discount_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flat_projection() {
        assert_eq!(project_cash_flows(dec!(100), None, 3).unwrap(), vec![dec!(100); 3]);
    }

    #[test]
    fn test_growth_projection() {
        let cfs = project_cash_flows(dec!(100), Some(dec!(0.10)), 3).unwrap();
        assert_eq!(cfs, vec![dec!(110), dec!(121), dec!(133.1)]);
    }

    #[test]
    fn test_negative_growth_projection() {
        let cfs = project_cash_flows(dec!(200), Some(dec!(-0.5)), 2).unwrap();
        assert_eq!(cfs, vec![dec!(100), dec!(50)]);
    }

    #[test]
    fn test_build_projection_discounts() {
        let result = build_projection(dec!(100), Some(dec!(0.10)), 3, dec!(0.10)).unwrap();
        assert_eq!(result.horizon(), 3);
        for y in &result.years {
            assert_eq!(y.present_value, dec!(100));
        }
        assert_eq!(result.sum_of_present_values, dec!(300));
        assert_eq!(result.years[2].period.label, "Year 3");
        assert_eq!(result.last_cash_flow(), Some(dec!(133.1)));
    }

    #[test]
    fn test_zero_rate_keeps_cash_flows() {
        let result = build_projection(dec!(80), None, 4, Decimal::ZERO).unwrap();
        assert_eq!(result.present_values(), result.cash_flows());
        assert_eq!(result.sum_of_present_values, dec!(320));
    }

    #[test]
    fn test_explosive_growth_is_error_not_panic() {
        let result = build_projection(dec!(1000000000), Some(dec!(10)), 25, dec!(0.10));
        assert!(matches!(
            result,
            Err(crate::error::IntrinsicError::OutOfRange { .. })
        ));
    }
}
