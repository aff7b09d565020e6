use rust_decimal::Decimal;

use crate::error::IntrinsicError;
use crate::types::{Money, Rate};
use crate::IntrinsicResult;

/// `(1+r)^periods`, failing instead of overflowing or collapsing to zero.
fn growth_factor(rate: Rate, periods: u32, context: &str) -> IntrinsicResult<Decimal> {
    let one_plus_r = Decimal::ONE + rate;
    let mut growth = Decimal::ONE;
    for t in 1..=periods {
        growth = growth
            .checked_mul(one_plus_r)
            .ok_or_else(|| IntrinsicError::out_of_range(format!("{context} at period {t}")))?;
        if growth.is_zero() {
            return Err(IntrinsicError::out_of_range(format!(
                "{context} at period {t}: compounding factor underflowed to zero"
            )));
        }
    }
    Ok(growth)
}

/// Discount factor `1 / (1+r)^periods`.
///
/// Precondition: `rate > -1`.
pub fn discount_factor(rate: Rate, periods: u32) -> IntrinsicResult<Rate> {
    let growth = growth_factor(rate, periods, "discount factor")?;
    Decimal::ONE
        .checked_div(growth)
        .ok_or_else(|| IntrinsicError::out_of_range(format!("discount factor at period {periods}")))
}

/// Present value of every cash flow, where `cash_flows[0]` arrives at the
/// end of year 1: `PV_t = CF_t / (1+r)^t`.
///
/// Precondition: `rate > -1`.
pub fn discount_cash_flows(cash_flows: &[Money], rate: Rate) -> IntrinsicResult<Vec<Money>> {
    let one_plus_r = Decimal::ONE + rate;
    let mut compounded = Decimal::ONE;
    let mut pvs = Vec::with_capacity(cash_flows.len());

    for (idx, cf) in cash_flows.iter().enumerate() {
        let t = idx + 1;
        compounded = compounded
            .checked_mul(one_plus_r)
            .ok_or_else(|| IntrinsicError::out_of_range(format!("discounting at period {t}")))?;
        if compounded.is_zero() {
            return Err(IntrinsicError::out_of_range(format!(
                "discounting at period {t}: compounding factor underflowed to zero"
            )));
        }
        let pv = cf
            .checked_div(compounded)
            .ok_or_else(|| IntrinsicError::out_of_range(format!("present value at period {t}")))?;
        pvs.push(pv);
    }

    Ok(pvs)
}

/// Overflow-checked sum.
pub fn checked_sum(values: &[Money], context: &str) -> IntrinsicResult<Money> {
    values.iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(*v)
            .ok_or_else(|| IntrinsicError::out_of_range(context))
    })
}

/// Net present value of year-1-onward cash flows (no time-zero flow).
pub fn present_value_sum(cash_flows: &[Money], rate: Rate) -> IntrinsicResult<Money> {
    let pvs = discount_cash_flows(cash_flows, rate)?;
    checked_sum(&pvs, "sum of present values")
}

/// `value * (1+rate)^periods`, compounded step by step so that exact
/// decimal inputs give exact outputs.
pub fn compound(value: Money, rate: Rate, periods: u32) -> IntrinsicResult<Money> {
    let one_plus_r = Decimal::ONE + rate;
    let mut out = value;
    for t in 1..=periods {
        out = out
            .checked_mul(one_plus_r)
            .ok_or_else(|| IntrinsicError::out_of_range(format!("compounding at period {t}")))?;
    }
    Ok(out)
}
