use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use intrinsic_core::types::{with_metadata, Money};
use intrinsic_core::valuation::growth::{estimate_growth, GrowthEstimate};
use intrinsic_core::valuation::outliers::filter_outliers;
use intrinsic_core::valuation::DEFAULT_OUTLIER_Z_THRESHOLD;

/// Arguments for a stand-alone growth estimate
#[derive(Args, Serialize)]
#[command(allow_hyphen_values = true)]
pub struct CagrArgs {
    /// Cash flows, oldest first
    #[arg(required = true, num_args = 1..)]
    pub values: Vec<Decimal>,

    /// Skip outlier filtering
    #[arg(long)]
    pub keep_outliers: bool,

    /// z-score at which values count as outliers
    #[arg(long)]
    pub outlier_threshold: Option<Decimal>,
}

#[derive(Serialize)]
struct CagrOutput {
    kept: Vec<Money>,
    outliers: Vec<Money>,
    growth: GrowthEstimate,
}

pub fn run_cagr(args: CagrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let (kept, outliers) = if args.keep_outliers {
        (args.values.clone(), Vec::new())
    } else {
        let threshold = args.outlier_threshold.unwrap_or(DEFAULT_OUTLIER_Z_THRESHOLD);
        let split = filter_outliers(&args.values, threshold);
        (split.kept, split.outliers)
    };

    let growth = estimate_growth(&kept, None);
    if growth.is_undetermined() {
        warnings.push(
            "CAGR undetermined: need at least two values with positive first and last".to_string(),
        );
    }

    let output = CagrOutput {
        kept,
        outliers,
        growth,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(serde_json::to_value(with_metadata(
        "Compound Annual Growth Rate",
        &args,
        warnings,
        elapsed,
        output,
    ))?)
}
