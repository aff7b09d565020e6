pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use intrinsic_core::types::ComputationOutput;
use intrinsic_core::valuation::dcf::DcfReport;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Recover a typed valuation report from a serialised envelope, if that is
/// what `value` holds.
pub(crate) fn as_report(value: &Value) -> Option<ComputationOutput<DcfReport>> {
    let result = value.get("result")?;
    if result.get("projection").is_none() || result.get("sensitivity").is_none() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}
