use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::IntrinsicError;
use crate::time_value::present_value_sum;
use crate::types::*;
use crate::valuation::dcf::equity_bridge;
use crate::valuation::terminal::{calculate_terminal_value, TerminalValueMethod};
use crate::IntrinsicResult;

/// Offset applied either side of the base discount rate and terminal growth.
pub const DEFAULT_SENSITIVITY_STEP: Decimal = dec!(0.01);

/// How explicit-period cash flows are discounted in each grid row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityPolicy {
    /// Explicit-period present values are recomputed at each row's
    /// discount rate, so every cell is internally consistent.
    #[default]
    FullRediscount,
    /// Explicit-period present value stays at the base-rate figure; only
    /// the terminal value responds to the perturbed discount rate.
    TerminalOnly,
}

/// Result of one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GridCell {
    Computed { price_per_share: Money },
    NotComputable { reason: String },
}

impl GridCell {
    pub fn price_per_share(&self) -> Option<Money> {
        match self {
            GridCell::Computed { price_per_share } => Some(*price_per_share),
            GridCell::NotComputable { .. } => None,
        }
    }

    pub fn is_computable(&self) -> bool {
        matches!(self, GridCell::Computed { .. })
    }
}

/// Inputs for a discount-rate × terminal-growth sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// Explicit-period cash flows, year 1 first
    pub projected_cash_flows: Vec<Money>,
    pub base_discount_rate: Rate,
    pub base_terminal_growth: Rate,
    pub net_debt: Money,
    pub shares_outstanding: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<SensitivityPolicy>,
}

/// Price per share across perturbed discount rates (rows) and terminal
/// growth rates (columns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub discount_rates: Vec<Rate>,
    pub terminal_growth_rates: Vec<Rate>,
    /// cells[i][j] = price when discount rate = discount_rates[i] and
    /// terminal growth = terminal_growth_rates[j]
    pub cells: Vec<Vec<GridCell>>,
    /// Position of the base case in the grid (row, col)
    pub base_case_position: (usize, usize),
    pub policy: SensitivityPolicy,
}

impl SensitivityGrid {
    pub fn cell(&self, row: usize, col: usize) -> Option<&GridCell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    pub fn base_case(&self) -> Option<&GridCell> {
        self.cell(self.base_case_position.0, self.base_case_position.1)
    }

    pub fn non_computable_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| !c.is_computable())
            .count()
    }
}

/// `[base - step, base, base + step]`
pub fn perturb(base: Rate, step: Rate) -> Vec<Rate> {
    vec![base - step, base, base + step]
}

/// Evaluate every (discount rate, terminal growth) pair with `eval_fn`.
///
/// Cells whose parameters make the terminal value undefined, or push a
/// result outside the decimal range, become `NotComputable`; any other
/// error aborts the grid.
pub fn evaluate_grid<F>(
    discount_rates: &[Rate],
    terminal_growth_rates: &[Rate],
    eval_fn: F,
) -> IntrinsicResult<Vec<Vec<GridCell>>>
where
    F: Fn(Rate, Rate) -> IntrinsicResult<Money>,
{
    let mut matrix = Vec::with_capacity(discount_rates.len());

    for dr in discount_rates {
        let mut row = Vec::with_capacity(terminal_growth_rates.len());
        for tg in terminal_growth_rates {
            match eval_fn(*dr, *tg) {
                Ok(price_per_share) => row.push(GridCell::Computed { price_per_share }),
                Err(
                    e @ (IntrinsicError::TerminalValueUndefined { .. }
                    | IntrinsicError::OutOfRange { .. }),
                ) => {
                    debug!(discount_rate = %dr, terminal_growth = %tg, "sensitivity cell not computable");
                    row.push(GridCell::NotComputable {
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        matrix.push(row);
    }

    Ok(matrix)
}

/// Build the 3×3 perpetuity-growth sensitivity grid.
pub fn build_sensitivity_grid(input: &SensitivityInput) -> IntrinsicResult<SensitivityGrid> {
    validate_sensitivity_input(input)?;

    let step = input.step.unwrap_or(DEFAULT_SENSITIVITY_STEP);
    let policy = input.policy.unwrap_or_default();
    let cash_flows = &input.projected_cash_flows;
    let horizon = cash_flows.len() as u32;
    let last_cf = *cash_flows.last().ok_or_else(|| {
        IntrinsicError::InsufficientData("No projected cash flows to perturb".into())
    })?;

    let discount_rates = perturb(input.base_discount_rate, step);
    let terminal_growth_rates = perturb(input.base_terminal_growth, step);
    let base_explicit_pv = present_value_sum(cash_flows, input.base_discount_rate)?;

    let cells = evaluate_grid(&discount_rates, &terminal_growth_rates, |dr, tg| {
        if dr <= dec!(-1) {
            // Discounting is undefined here just as the perpetuity is
            return Err(IntrinsicError::TerminalValueUndefined {
                discount_rate: dr,
                terminal_growth: tg,
            });
        }
        let explicit_pv = match policy {
            SensitivityPolicy::FullRediscount => present_value_sum(cash_flows, dr)?,
            SensitivityPolicy::TerminalOnly => base_explicit_pv,
        };
        let terminal = calculate_terminal_value(
            last_cf,
            dr,
            horizon,
            TerminalValueMethod::PerpetuityGrowth { growth_rate: tg },
        )?;
        let bridge = equity_bridge(
            explicit_pv,
            terminal.present_value,
            input.net_debt,
            input.shares_outstanding,
        )?;
        Ok(bridge.price_per_share)
    })?;

    Ok(SensitivityGrid {
        discount_rates,
        terminal_growth_rates,
        cells,
        base_case_position: (1, 1),
        policy,
    })
}

/// Standalone sensitivity run wrapped in the standard output envelope.
pub fn run_sensitivity(input: &SensitivityInput) -> IntrinsicResult<ComputationOutput<SensitivityGrid>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let grid = build_sensitivity_grid(input)?;
    let missing = grid.non_computable_count();
    if missing > 0 {
        warnings.push(format!(
            "{missing} of {} cells not computable (discount rate must exceed terminal growth)",
            grid.discount_rates.len() * grid.terminal_growth_rates.len()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "DCF Sensitivity: Discount Rate x Terminal Growth",
        input,
        warnings,
        elapsed,
        grid,
    ))
}

fn validate_sensitivity_input(input: &SensitivityInput) -> IntrinsicResult<()> {
    if let Some(step) = input.step {
        if step <= Decimal::ZERO {
            return Err(IntrinsicError::InvalidInput {
                field: "step".into(),
                reason: "Sensitivity step must be positive".into(),
            });
        }
    }
    if input.shares_outstanding <= Decimal::ZERO {
        return Err(IntrinsicError::InsufficientData(
            "Shares outstanding must be positive".into(),
        ));
    }
    Ok(())
}
