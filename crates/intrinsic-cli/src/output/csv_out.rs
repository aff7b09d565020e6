use serde_json::Value;
use std::fs::File;
use std::io;

use intrinsic_core::valuation::dcf::DcfReport;

use super::as_report;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();

    if let Some(report) = as_report(value) {
        if let Err(e) = write_report(stdout.lock(), &report.result) {
            eprintln!("CSV write error: {}", e);
        }
        return;
    }

    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(stdout.lock());
    let fields = match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => result,
            _ => map,
        },
        other => {
            let _ = wtr.write_record([format_csv_value(other)]);
            let _ = wtr.flush();
            return;
        }
    };

    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in fields {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
    let _ = wtr.flush();
}

/// Write the projection table, terminal value and price per share to `path`.
pub fn export_report(path: &str, report: &DcfReport) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path).map_err(|e| format!("Failed to create '{}': {}", path, e))?;
    write_report(file, report)
}

/// Rows: `Year, Projected FCF, Present Value` per explicit year, then the
/// terminal value with its present value, then the intrinsic value per share.
pub fn write_report<W: io::Write>(writer: W, report: &DcfReport) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    wtr.write_record(["Year", "Projected FCF", "Present Value"])?;
    for y in &report.projection.years {
        wtr.write_record([
            y.period.year.to_string(),
            y.cash_flow.to_string(),
            y.present_value.to_string(),
        ])?;
    }
    wtr.write_record([
        "Terminal Value".to_string(),
        report.terminal.terminal_value.to_string(),
        report.terminal.present_value.to_string(),
    ])?;
    wtr.write_record([
        "Intrinsic Value per Share".to_string(),
        report.valuation.price_per_share.to_string(),
    ])?;
    wtr.flush()?;
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intrinsic_core::financials::CompanyFinancials;
    use intrinsic_core::types::{CashFlowSeries, Currency};
    use intrinsic_core::valuation::dcf::{valuate, ValuationAssumptions};
    use intrinsic_core::valuation::terminal::TerminalValueMethod;
    use rust_decimal_macros::dec;

    fn sample_report() -> DcfReport {
        let financials = CompanyFinancials {
            ticker: None,
            company_name: "Csv Co".into(),
            currency: Currency::USD,
            shares_outstanding: dec!(10),
            net_debt: dec!(0),
            historical: CashFlowSeries::from_pairs([("2022", dec!(100)), ("2023", dec!(110))]),
            cash_flow_source: None,
            caveats: vec![],
        };
        let mut assumptions = ValuationAssumptions::new(
            dec!(0.10),
            3,
            TerminalValueMethod::ExitMultiple { multiple: dec!(10) },
        );
        assumptions.growth_override = Some(dec!(0.10));
        valuate(&financials, &assumptions).unwrap().result
    }

    #[test]
    fn test_report_rows() {
        let mut buf = Vec::new();
        write_report(&mut buf, &sample_report()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Year,Projected FCF,Present Value");
        assert!(lines[1].starts_with("1,121"), "got {}", lines[1]);
        assert_eq!(lines[1].split(',').count(), 3);
        assert!(lines[4].starts_with("Terminal Value,1464.1"));
        assert!(lines[5].starts_with("Intrinsic Value per Share,"));
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dcf_results.csv");
        export_report(path.to_str().unwrap(), &sample_report()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Terminal Value"));
    }
}
