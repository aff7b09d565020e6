use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::IntrinsicError;
use crate::financials::{CashFlowSource, CompanyFinancials};
use crate::scenarios::sensitivity::{
    build_sensitivity_grid, SensitivityGrid, SensitivityInput, SensitivityPolicy,
};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};
use crate::IntrinsicResult;

use super::growth::{estimate_growth, GrowthEstimate};
use super::outliers::filter_outliers;
use super::projection::{build_projection, ProjectionResult};
use super::terminal::{calculate_terminal_value, TerminalValueMethod, TerminalValueResult};
use super::{DEFAULT_OUTLIER_Z_THRESHOLD, DEFAULT_SENSITIVITY_TERMINAL_GROWTH};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Valuation assumptions. Optional fields fall back to the module defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationAssumptions {
    /// Annual discount rate applied to projected flows and the terminal value
    pub discount_rate: Rate,
    /// Explicit forecast horizon in years (at least 1)
    pub projection_years: u32,
    /// Terminal value method
    pub terminal: TerminalValueMethod,
    /// Replaces the historical CAGR when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_override: Option<Rate>,
    /// z-score threshold for historical outliers (default 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_threshold: Option<Decimal>,
    /// Sensitivity offset either side of the base rates (default 0.01)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity_step: Option<Rate>,
    /// Explicit-period discounting in the sensitivity grid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity_policy: Option<SensitivityPolicy>,
    /// Terminal growth for the grid when the base case uses an exit
    /// multiple (default 0.03)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity_terminal_growth: Option<Rate>,
}

impl ValuationAssumptions {
    pub fn new(discount_rate: Rate, projection_years: u32, terminal: TerminalValueMethod) -> Self {
        Self {
            discount_rate,
            projection_years,
            terminal,
            growth_override: None,
            outlier_threshold: None,
            sensitivity_step: None,
            sensitivity_policy: None,
            sensitivity_terminal_growth: None,
        }
    }

    /// Terminal growth the sensitivity grid is centred on.
    pub fn sensitivity_base_growth(&self) -> Rate {
        match self.terminal {
            TerminalValueMethod::PerpetuityGrowth { growth_rate } => growth_rate,
            TerminalValueMethod::ExitMultiple { .. } => self
                .sensitivity_terminal_growth
                .unwrap_or(DEFAULT_SENSITIVITY_TERMINAL_GROWTH),
        }
    }
}

/// Enterprise-to-equity bridge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityBridge {
    pub enterprise_value: Money,
    pub equity_value: Money,
    pub price_per_share: Money,
}

/// Headline valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationOutput {
    pub enterprise_value: Money,
    pub net_debt: Money,
    pub equity_value: Money,
    pub price_per_share: Money,
    pub growth: GrowthEstimate,
    /// Historical values excluded from the growth estimate
    pub outliers: Vec<Money>,
    /// PV(terminal value) / enterprise value
    pub terminal_value_pct: Rate,
}

/// Everything produced for one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    pub company_name: String,
    pub currency: Currency,
    pub shares_outstanding: Decimal,
    /// Statement line the historical series came from, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_flow_source: Option<CashFlowSource>,
    /// Historical values used, period and value, oldest first
    pub historical: Vec<(String, Money)>,
    pub projection: ProjectionResult,
    pub terminal: TerminalValueResult,
    pub valuation: ValuationOutput,
    pub sensitivity: SensitivityGrid,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// `EV = PV(explicit) + PV(TV)`, `equity = EV - net debt`,
/// `price = equity / shares`.
pub fn equity_bridge(
    pv_explicit: Money,
    pv_terminal: Money,
    net_debt: Money,
    shares_outstanding: Decimal,
) -> IntrinsicResult<EquityBridge> {
    if shares_outstanding.is_zero() {
        return Err(IntrinsicError::InsufficientData(
            "Shares outstanding is zero".into(),
        ));
    }
    if shares_outstanding < Decimal::ZERO {
        return Err(IntrinsicError::InvalidInput {
            field: "shares_outstanding".into(),
            reason: "Shares outstanding cannot be negative".into(),
        });
    }

    let enterprise_value = pv_explicit
        .checked_add(pv_terminal)
        .ok_or_else(|| IntrinsicError::out_of_range("enterprise value"))?;
    let equity_value = enterprise_value
        .checked_sub(net_debt)
        .ok_or_else(|| IntrinsicError::out_of_range("equity value"))?;
    let price_per_share = equity_value
        .checked_div(shares_outstanding)
        .ok_or_else(|| IntrinsicError::out_of_range("price per share"))?;
    Ok(EquityBridge {
        enterprise_value,
        equity_value,
        price_per_share,
    })
}

/// Value one company from its historical cash flows.
///
/// Pipeline: outlier filter, growth estimate, projection, discounting,
/// terminal value, equity bridge, sensitivity grid. Fails with
/// `InsufficientData` when there is no usable history or no shares, and
/// with `TerminalValueUndefined` when the base case perpetuity diverges.
pub fn valuate(
    financials: &CompanyFinancials,
    assumptions: &ValuationAssumptions,
) -> IntrinsicResult<ComputationOutput<DcfReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = financials.caveats.clone();

    validate_assumptions(assumptions)?;
    validate_financials(financials)?;

    let historical: Vec<(String, Money)> = financials
        .historical
        .valid_entries()
        .map(|(p, v)| (p.to_string(), v))
        .collect();
    let values: Vec<Money> = historical.iter().map(|(_, v)| *v).collect();

    // --- Outliers ---
    let threshold = assumptions
        .outlier_threshold
        .unwrap_or(DEFAULT_OUTLIER_Z_THRESHOLD);
    let split = filter_outliers(&values, threshold);
    if !split.outliers.is_empty() {
        debug!(count = split.outliers.len(), "historical outliers removed");
        warnings.push(format!(
            "Outliers removed from historical cash flows before growth estimation: {}",
            join_values(&split.outliers)
        ));
    }

    // --- Growth ---
    let growth = estimate_growth(&split.kept, assumptions.growth_override);
    if growth.is_undetermined() {
        warn!("growth rate undetermined, projecting flat cash flows");
        warnings.push(
            "Growth rate undetermined (insufficient or non-positive history); projections assume no growth"
                .to_string(),
        );
    }

    // --- Projection ---
    let last_cf = match split.kept.last().or(values.last()) {
        Some(v) => *v,
        None => {
            return Err(IntrinsicError::InsufficientData(
                "No usable historical cash flows".into(),
            ))
        }
    };
    let projection = build_projection(
        last_cf,
        growth.rate(),
        assumptions.projection_years,
        assumptions.discount_rate,
    )?;
    let last_projected = projection.last_cash_flow().ok_or_else(|| {
        IntrinsicError::InsufficientData("No projection years generated".into())
    })?;

    // --- Terminal value ---
    let terminal = calculate_terminal_value(
        last_projected,
        assumptions.discount_rate,
        projection.horizon(),
        assumptions.terminal,
    )?;

    // --- Equity bridge ---
    let bridge = equity_bridge(
        projection.sum_of_present_values,
        terminal.present_value,
        financials.net_debt,
        financials.shares_outstanding,
    )?;

    let tv_pct = if bridge.enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        terminal
            .present_value
            .checked_div(bridge.enterprise_value)
            .ok_or_else(|| IntrinsicError::out_of_range("terminal value share of enterprise value"))?
    };
    if tv_pct > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            tv_pct * dec!(100)
        ));
    }
    if bridge.equity_value < Decimal::ZERO {
        warnings.push("Net debt exceeds enterprise value; equity value is negative".to_string());
    }

    // --- Sensitivity ---
    let sensitivity = build_sensitivity_grid(&SensitivityInput {
        projected_cash_flows: projection.cash_flows(),
        base_discount_rate: assumptions.discount_rate,
        base_terminal_growth: assumptions.sensitivity_base_growth(),
        net_debt: financials.net_debt,
        shares_outstanding: financials.shares_outstanding,
        step: assumptions.sensitivity_step,
        policy: assumptions.sensitivity_policy,
    })?;

    debug!(
        enterprise_value = %bridge.enterprise_value,
        price_per_share = %bridge.price_per_share,
        "valuation complete"
    );

    let report = DcfReport {
        ticker: financials.ticker.clone(),
        company_name: financials.company_name.clone(),
        currency: financials.currency.clone(),
        shares_outstanding: financials.shares_outstanding,
        cash_flow_source: financials.cash_flow_source,
        historical,
        valuation: ValuationOutput {
            enterprise_value: bridge.enterprise_value,
            net_debt: financials.net_debt,
            equity_value: bridge.equity_value,
            price_per_share: bridge.price_per_share,
            growth,
            outliers: split.outliers,
            terminal_value_pct: tv_pct,
        },
        projection,
        terminal,
        sensitivity,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "FCF DCF (CAGR projection, end-of-year discounting)",
        assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_assumptions(assumptions: &ValuationAssumptions) -> IntrinsicResult<()> {
    if assumptions.discount_rate <= dec!(-1) {
        return Err(IntrinsicError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    if assumptions.projection_years == 0 {
        return Err(IntrinsicError::InvalidInput {
            field: "projection_years".into(),
            reason: "Projection horizon must be at least 1 year".into(),
        });
    }
    if let TerminalValueMethod::ExitMultiple { multiple } = assumptions.terminal {
        if multiple <= Decimal::ZERO {
            return Err(IntrinsicError::InvalidInput {
                field: "exit_multiple".into(),
                reason: "Exit multiple must be positive".into(),
            });
        }
    }
    if let Some(threshold) = assumptions.outlier_threshold {
        if threshold <= Decimal::ZERO {
            return Err(IntrinsicError::InvalidInput {
                field: "outlier_threshold".into(),
                reason: "Outlier z-score threshold must be positive".into(),
            });
        }
    }
    if let Some(step) = assumptions.sensitivity_step {
        if step <= Decimal::ZERO {
            return Err(IntrinsicError::InvalidInput {
                field: "sensitivity_step".into(),
                reason: "Sensitivity step must be positive".into(),
            });
        }
    }
    Ok(())
}

fn validate_financials(financials: &CompanyFinancials) -> IntrinsicResult<()> {
    if financials.historical.is_empty() {
        return Err(IntrinsicError::InsufficientData(
            "No usable historical cash flows".into(),
        ));
    }
    if financials.shares_outstanding.is_zero() {
        return Err(IntrinsicError::InsufficientData(
            "Shares outstanding is zero".into(),
        ));
    }
    if financials.shares_outstanding < Decimal::ZERO {
        return Err(IntrinsicError::InvalidInput {
            field: "shares_outstanding".into(),
            reason: "Shares outstanding cannot be negative".into(),
        });
    }
    Ok(())
}

fn join_values(values: &[Money]) -> String {
    values
        .iter()
        .map(|v| v.round_dp(0).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CashFlowSeries;
    use rust_decimal_macros::dec;

    fn sample_financials() -> CompanyFinancials {
        CompanyFinancials {
            ticker: Some("TEST".into()),
            company_name: "Test Corp".into(),
            currency: Currency::USD,
            shares_outstanding: dec!(1000),
            net_debt: dec!(100),
            historical: CashFlowSeries::from_pairs([
                ("2020", dec!(100)),
                ("2021", dec!(105)),
                ("2022", dec!(112)),
                ("2023", dec!(118)),
            ]),
            cash_flow_source: None,
            caveats: vec![],
        }
    }

    fn gordon_assumptions() -> ValuationAssumptions {
        ValuationAssumptions::new(
            dec!(0.10),
            5,
            TerminalValueMethod::PerpetuityGrowth {
                growth_rate: dec!(0.03),
            },
        )
    }

    #[test]
    fn test_equity_bridge() {
        let bridge = equity_bridge(dec!(700), dec!(300), dec!(200), dec!(40)).unwrap();
        assert_eq!(bridge.enterprise_value, dec!(1000));
        assert_eq!(bridge.equity_value, dec!(800));
        assert_eq!(bridge.price_per_share, dec!(20));
    }

    #[test]
    fn test_equity_bridge_zero_shares() {
        let err = equity_bridge(dec!(700), dec!(300), dec!(0), dec!(0)).unwrap_err();
        assert!(matches!(err, IntrinsicError::InsufficientData(_)));
    }

    #[test]
    fn test_valuate_basic() {
        let out = valuate(&sample_financials(), &gordon_assumptions()).unwrap();
        let r = &out.result;

        assert_eq!(r.projection.years.len(), 5);
        assert!(matches!(r.valuation.growth, GrowthEstimate::Historical { .. }));
        assert_eq!(
            r.valuation.enterprise_value,
            r.projection.sum_of_present_values + r.terminal.present_value
        );
        assert_eq!(r.valuation.equity_value, r.valuation.enterprise_value - dec!(100));
        assert_eq!(r.valuation.price_per_share, r.valuation.equity_value / dec!(1000));
        assert_eq!(out.methodology, "FCF DCF (CAGR projection, end-of-year discounting)");
    }

    #[test]
    fn test_valuate_base_cell_matches_headline() {
        let out = valuate(&sample_financials(), &gordon_assumptions()).unwrap();
        let r = &out.result;
        let base = r.sensitivity.base_case().and_then(|c| c.price_per_share()).unwrap();
        assert_eq!(base, r.valuation.price_per_share);
    }

    #[test]
    fn test_valuate_divergent_perpetuity_fails() {
        let mut a = gordon_assumptions();
        a.terminal = TerminalValueMethod::PerpetuityGrowth {
            growth_rate: dec!(0.12),
        };
        assert!(matches!(
            valuate(&sample_financials(), &a),
            Err(IntrinsicError::TerminalValueUndefined { .. })
        ));
    }

    #[test]
    fn test_valuate_no_history() {
        let mut f = sample_financials();
        f.historical = CashFlowSeries::default();
        assert!(matches!(
            valuate(&f, &gordon_assumptions()),
            Err(IntrinsicError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_valuate_zero_shares() {
        let mut f = sample_financials();
        f.shares_outstanding = Decimal::ZERO;
        assert!(matches!(
            valuate(&f, &gordon_assumptions()),
            Err(IntrinsicError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_valuate_rejects_bad_assumptions() {
        let mut a = gordon_assumptions();
        a.discount_rate = dec!(-1);
        assert!(valuate(&sample_financials(), &a).is_err());

        let mut a = gordon_assumptions();
        a.projection_years = 0;
        assert!(valuate(&sample_financials(), &a).is_err());
    }

    #[test]
    fn test_undetermined_growth_is_flagged() {
        let mut f = sample_financials();
        f.historical = CashFlowSeries::from_pairs([("2022", dec!(-20)), ("2023", dec!(50))]);
        let out = valuate(&f, &gordon_assumptions()).unwrap();

        assert!(out.result.valuation.growth.is_undetermined());
        assert!(out.result.projection.cash_flows().iter().all(|cf| *cf == dec!(50)));
        assert!(out.warnings.iter().any(|w| w.contains("undetermined")));
    }

    #[test]
    fn test_upstream_caveats_carried() {
        let mut f = sample_financials();
        f.caveats = vec!["Used Net Income as cash flow proxy".into()];
        let out = valuate(&f, &gordon_assumptions()).unwrap();
        assert_eq!(out.warnings[0], "Used Net Income as cash flow proxy");
    }

    #[test]
    fn test_exit_multiple_grid_uses_default_growth() {
        let mut a = gordon_assumptions();
        a.terminal = TerminalValueMethod::ExitMultiple { multiple: dec!(12) };
        let out = valuate(&sample_financials(), &a).unwrap();
        let r = &out.result;

        assert_eq!(r.terminal.terminal_value, r.projection.last_cash_flow().unwrap() * dec!(12));
        assert_eq!(r.sensitivity.terminal_growth_rates[1], DEFAULT_SENSITIVITY_TERMINAL_GROWTH);
    }

    #[test]
    fn test_valuate_explosive_override_is_error() {
        let mut financials = sample_financials();
        financials.historical = CashFlowSeries::from_pairs([
            ("2022", dec!(900000000)),
            ("2023", dec!(1000000000)),
        ]);
        let mut a = gordon_assumptions();
        a.projection_years = 25;
        a.growth_override = Some(dec!(10));
        assert!(matches!(
            valuate(&financials, &a),
            Err(IntrinsicError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_valuate_very_long_horizon_is_error() {
        let mut a = gordon_assumptions();
        a.projection_years = 800;
        assert!(matches!(
            valuate(&sample_financials(), &a),
            Err(IntrinsicError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_equity_bridge_overflow_is_error() {
        let err = equity_bridge(Decimal::MAX, dec!(1), dec!(0), dec!(1)).unwrap_err();
        assert!(matches!(err, IntrinsicError::OutOfRange { .. }));
    }

    #[test]
    fn test_report_carries_cash_flow_source() {
        let mut financials = sample_financials();
        financials.cash_flow_source = Some(CashFlowSource::OperatingCashFlowLessCapex);
        let out = valuate(&financials, &gordon_assumptions()).unwrap();
        assert_eq!(
            out.result.cash_flow_source,
            Some(CashFlowSource::OperatingCashFlowLessCapex)
        );

        let json = serde_json::to_value(&out.result).unwrap();
        assert_eq!(json["cash_flow_source"], "operating_cash_flow_less_capex");
    }
}
