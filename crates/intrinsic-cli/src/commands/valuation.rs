use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use intrinsic_core::financials::FinancialsInput;
use intrinsic_core::scenarios::sensitivity::SensitivityPolicy;
use intrinsic_core::valuation::dcf::{self, ValuationAssumptions};
use intrinsic_core::valuation::terminal::TerminalValueMethod;

use crate::input;
use crate::output;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TerminalType {
    /// Perpetuity growth
    #[value(name = "g", alias = "growth")]
    Growth,
    /// Exit multiple of final-year cash flow
    #[value(name = "m", alias = "multiple")]
    Multiple,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Re-discount explicit cash flows at each grid discount rate
    Full,
    /// Keep the base-case explicit present value in every cell
    TerminalOnly,
}

impl From<PolicyArg> for SensitivityPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Full => SensitivityPolicy::FullRediscount,
            PolicyArg::TerminalOnly => SensitivityPolicy::TerminalOnly,
        }
    }
}

/// Arguments for a DCF valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ValueArgs {
    /// Path to JSON financials: a resolved cash-flow series or raw statements
    #[arg(long)]
    pub financials: Option<String>,

    /// Path to JSON assumptions file (overrides individual flags)
    #[arg(long)]
    pub assumptions: Option<String>,

    /// Discount rate (e.g. 0.10 for 10%)
    #[arg(long, default_value = "0.10")]
    pub discount_rate: Decimal,

    /// Number of explicit projection years
    #[arg(long, default_value = "5")]
    pub projection_years: u32,

    /// Terminal value method: growth (g) or multiple (m)
    #[arg(long, value_enum, default_value = "g")]
    pub terminal_type: TerminalType,

    /// Terminal growth rate; also centres the sensitivity grid
    #[arg(long, default_value = "0.03")]
    pub terminal_growth: Decimal,

    /// Terminal multiple of final-year cash flow (with --terminal-type m)
    #[arg(long)]
    pub terminal_multiple: Option<Decimal>,

    /// Use this growth rate instead of the historical CAGR
    #[arg(long)]
    pub growth_override: Option<Decimal>,

    /// z-score at which historical values count as outliers
    #[arg(long)]
    pub outlier_threshold: Option<Decimal>,

    /// Sensitivity offset either side of the base rates
    #[arg(long)]
    pub sensitivity_step: Option<Decimal>,

    /// Explicit-period discounting in the sensitivity grid
    #[arg(long, value_enum)]
    pub sensitivity_policy: Option<PolicyArg>,

    /// Also write projection, terminal value and price to this CSV file
    #[arg(long)]
    pub export_csv: Option<String>,
}

fn assumptions_from_args(args: &ValueArgs) -> Result<ValuationAssumptions, Box<dyn std::error::Error>> {
    let terminal = match args.terminal_type {
        TerminalType::Growth => TerminalValueMethod::PerpetuityGrowth {
            growth_rate: args.terminal_growth,
        },
        TerminalType::Multiple => TerminalValueMethod::ExitMultiple {
            multiple: args
                .terminal_multiple
                .ok_or("--terminal-multiple is required with --terminal-type m")?,
        },
    };

    let mut assumptions =
        ValuationAssumptions::new(args.discount_rate, args.projection_years, terminal);
    assumptions.growth_override = args.growth_override;
    assumptions.outlier_threshold = args.outlier_threshold;
    assumptions.sensitivity_step = args.sensitivity_step;
    assumptions.sensitivity_policy = args.sensitivity_policy.map(Into::into);
    if matches!(args.terminal_type, TerminalType::Multiple) {
        assumptions.sensitivity_terminal_growth = Some(args.terminal_growth);
    }
    Ok(assumptions)
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let financials_json: Value = if let Some(ref path) = args.financials {
        input::file::read_json_value(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--financials file is required (or pipe JSON on stdin)".into());
    };
    let financials = serde_json::from_value::<FinancialsInput>(financials_json)
        .map_err(|e| format!("Unrecognised financials input: {e}"))?
        .into_financials();

    let assumptions: ValuationAssumptions = match args.assumptions {
        Some(ref path) => input::file::read_json(path)?,
        None => assumptions_from_args(&args)?,
    };

    info!(
        company = %financials.company_name,
        periods = financials.historical.entries.len(),
        "running valuation"
    );
    let result = dcf::valuate(&financials, &assumptions)?;

    if let Some(ref path) = args.export_csv {
        output::csv_out::export_report(path, &result.result)?;
        info!(path = %path, "exported valuation CSV");
    }

    Ok(serde_json::to_value(result)?)
}
