use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::IntrinsicError;
use crate::time_value::discount_factor;
use crate::types::{Money, Multiple, Rate};
use crate::IntrinsicResult;

/// How the value beyond the explicit horizon is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TerminalValueMethod {
    /// Gordon growth: TV = CF_N * (1+g) / (r - g), valid only for r > g
    PerpetuityGrowth { growth_rate: Rate },
    /// TV = CF_N * multiple
    ExitMultiple { multiple: Multiple },
}

/// Terminal value and its present value under one discount rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalValueResult {
    pub method: TerminalValueMethod,
    pub terminal_value: Money,
    pub discount_factor: Rate,
    pub present_value: Money,
}

/// Undiscounted terminal value at the end of the horizon.
pub fn terminal_value(
    last_cf: Money,
    discount_rate: Rate,
    method: TerminalValueMethod,
) -> IntrinsicResult<Money> {
    match method {
        TerminalValueMethod::ExitMultiple { multiple } => {
            if multiple <= Decimal::ZERO {
                return Err(IntrinsicError::InvalidInput {
                    field: "exit_multiple".into(),
                    reason: "Exit multiple must be positive".into(),
                });
            }
            last_cf
                .checked_mul(multiple)
                .ok_or_else(|| IntrinsicError::out_of_range("exit-multiple terminal value"))
        }
        TerminalValueMethod::PerpetuityGrowth { growth_rate } => {
            if discount_rate <= growth_rate {
                return Err(IntrinsicError::TerminalValueUndefined {
                    discount_rate,
                    terminal_growth: growth_rate,
                });
            }
            last_cf
                .checked_mul(Decimal::ONE + growth_rate)
                .and_then(|n| n.checked_div(discount_rate - growth_rate))
                .ok_or_else(|| IntrinsicError::out_of_range("perpetuity-growth terminal value"))
        }
    }
}

/// Terminal value discounted back `horizon` years at the same rate used in
/// the terminal formula.
pub fn calculate_terminal_value(
    last_cf: Money,
    discount_rate: Rate,
    horizon: u32,
    method: TerminalValueMethod,
) -> IntrinsicResult<TerminalValueResult> {
    let tv = terminal_value(last_cf, discount_rate, method)?;
    let df = discount_factor(discount_rate, horizon)?;
    let present_value = tv
        .checked_mul(df)
        .ok_or_else(|| IntrinsicError::out_of_range("present value of terminal value"))?;
    Ok(TerminalValueResult {
        method,
        terminal_value: tv,
        discount_factor: df,
        present_value,
    })
}
