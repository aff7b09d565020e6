use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::Value;
use tabled::{builder::Builder, Table};

use intrinsic_core::scenarios::sensitivity::GridCell;
use intrinsic_core::types::ComputationOutput;
use intrinsic_core::valuation::dcf::DcfReport;
use intrinsic_core::valuation::growth::GrowthEstimate;
use intrinsic_core::valuation::terminal::TerminalValueMethod;

use super::as_report;

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    if let Some(report) = as_report(value) {
        print_report(&report);
        return;
    }

    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        _ => println!("{}", value),
    }
}

// ---------------------------------------------------------------------------
// Valuation report
// ---------------------------------------------------------------------------

fn print_report(output: &ComputationOutput<DcfReport>) {
    let r = &output.result;
    let cur = r.currency.to_string();
    let horizon = r.projection.years.len();

    let title = match r.ticker {
        Some(ref t) => format!("{} ({})", r.company_name, t),
        None => r.company_name.clone(),
    };
    println!("{}", format!("DCF valuation: {title}").bold());
    println!("Currency: {cur}\n");

    // --- Assumptions ---
    let mut builder = Builder::default();
    builder.push_record(["Assumption", "Value"]);
    builder.push_record(["Discount rate".to_string(), fmt_pct(r.projection.discount_rate)]);
    builder.push_record(["Projection years".to_string(), horizon.to_string()]);
    builder.push_record(["Terminal value".to_string(), describe_terminal(r.terminal.method)]);
    builder.push_record(["Shares outstanding".to_string(), group_thousands(r.shares_outstanding.round_dp(0))]);
    builder.push_record(["Net debt".to_string(), format!("{cur} {}", fmt_money(r.valuation.net_debt))]);
    println!("{}", Table::from(builder));

    // --- History ---
    let mut builder = Builder::default();
    builder.push_record(["Year".to_string(), format!("Cash Flow ({cur})")]);
    for (period, value) in &r.historical {
        builder.push_record([period.clone(), fmt_money(*value)]);
    }
    println!("\n{}\n{}", history_title(r), Table::from(builder));
    if !r.valuation.outliers.is_empty() {
        let list: Vec<String> = r.valuation.outliers.iter().map(|o| fmt_money(*o)).collect();
        println!("Outliers excluded from growth: {}", list.join(", "));
    }

    match r.valuation.growth {
        GrowthEstimate::Historical { rate } => {
            println!("\nCalculated CAGR: {} per year", fmt_pct(rate))
        }
        GrowthEstimate::Override { rate } => {
            println!("\nGrowth override: {} per year", fmt_pct(rate))
        }
        GrowthEstimate::Undetermined => println!(
            "\n{}",
            "Growth undetermined: not enough valid history; projections assume no growth".yellow()
        ),
    }

    // --- Projection ---
    let mut builder = Builder::default();
    builder.push_record([
        "Year".to_string(),
        format!("Projected FCF ({cur})"),
        "Discount Factor".to_string(),
        format!("Present Value ({cur})"),
    ]);
    for y in &r.projection.years {
        builder.push_record([
            y.period.year.to_string(),
            fmt_money(y.cash_flow),
            y.discount_factor.round_dp(4).to_string(),
            fmt_money(y.present_value),
        ]);
    }
    println!("\nDiscounted cash flows\n{}", Table::from(builder));

    // --- Bridge ---
    let mut builder = Builder::default();
    builder.push_record(["Item", "Value"]);
    builder.push_record([
        format!("Sum of PVs (years 1-{horizon})"),
        fmt_money(r.projection.sum_of_present_values),
    ]);
    builder.push_record([
        format!("Terminal value (year {horizon})"),
        fmt_money(r.terminal.terminal_value),
    ]);
    builder.push_record(["PV of terminal value".to_string(), fmt_money(r.terminal.present_value)]);
    builder.push_record(["Enterprise value".to_string(), fmt_money(r.valuation.enterprise_value)]);
    builder.push_record(["Less net debt".to_string(), fmt_money(r.valuation.net_debt)]);
    builder.push_record(["Equity value".to_string(), fmt_money(r.valuation.equity_value)]);
    println!("\n{}", Table::from(builder));
    println!(
        "\n{} {cur} {}",
        "Intrinsic value per share:".bold(),
        fmt_price(r.valuation.price_per_share).bold()
    );
    if let Some(source) = r.cash_flow_source {
        println!("Cash flows sourced from: {}", source.description());
    }

    // --- Sensitivity ---
    let grid = &r.sensitivity;
    let mut builder = Builder::default();
    let mut header = vec![String::new()];
    header.extend(grid.terminal_growth_rates.iter().map(|tg| format!("Terminal {}", fmt_pct(*tg))));
    builder.push_record(header);
    for (dr, row) in grid.discount_rates.iter().zip(grid.cells.iter()) {
        let mut record = vec![format!("DR {}", fmt_pct(*dr))];
        record.extend(row.iter().map(|cell| match cell {
            GridCell::Computed { price_per_share } => format!("{cur} {}", fmt_price(*price_per_share)),
            GridCell::NotComputable { .. } => "N/A".to_string(),
        }));
        builder.push_record(record);
    }
    println!("\nSensitivity (price per share)\n{}", Table::from(builder));

    if !output.warnings.is_empty() {
        println!("\nWarnings:");
        for w in &output.warnings {
            println!("  - {}", w.yellow());
        }
    }
    println!("\nMethodology: {}", output.methodology);
}

fn history_title(report: &DcfReport) -> String {
    match report.cash_flow_source {
        Some(source) => format!("Historical cash flows (Source: {})", source.description()),
        None => "Historical cash flows".to_string(),
    }
}

fn describe_terminal(method: TerminalValueMethod) -> String {
    match method {
        TerminalValueMethod::PerpetuityGrowth { growth_rate } => {
            format!("{} perpetual growth", fmt_pct(growth_rate))
        }
        TerminalValueMethod::ExitMultiple { multiple } => format!("{multiple}x final-year FCF"),
    }
}

fn fmt_pct(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).round_dp(2))
}

fn fmt_money(value: Decimal) -> String {
    group_thousands(value.round_dp(0))
}

/// Two decimals for ordinary prices, four when the price is below one unit.
fn fmt_price(value: Decimal) -> String {
    if value.abs() < Decimal::ONE {
        value.round_dp(4).to_string()
    } else {
        let rounded = value.round_dp(2);
        let whole = rounded.trunc();
        let frac = (rounded - whole).abs();
        format!("{}{}", group_thousands(whole), &format!("{:.2}", frac)[1..])
    }
}

fn group_thousands(value: Decimal) -> String {
    let s = value.to_string();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

// ---------------------------------------------------------------------------
// Generic envelope
// ---------------------------------------------------------------------------

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    } else {
        print_flat_object(&Value::Object(envelope.clone()));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intrinsic_core::financials::{CashFlowSource, CompanyFinancials};
    use intrinsic_core::types::{CashFlowSeries, Currency};
    use intrinsic_core::valuation::dcf::{valuate, ValuationAssumptions};
    use rust_decimal_macros::dec;

    fn report_with_source(source: Option<CashFlowSource>) -> DcfReport {
        let financials = CompanyFinancials {
            ticker: Some("SRC".into()),
            company_name: "Source Co".into(),
            currency: Currency::USD,
            shares_outstanding: dec!(100),
            net_debt: dec!(0),
            historical: CashFlowSeries::from_pairs([
                ("2021", dec!(100)),
                ("2022", dec!(110)),
                ("2023", dec!(121)),
            ]),
            cash_flow_source: source,
            caveats: vec![],
        };
        let assumptions = ValuationAssumptions::new(
            dec!(0.10),
            3,
            TerminalValueMethod::PerpetuityGrowth { growth_rate: dec!(0.03) },
        );
        valuate(&financials, &assumptions).unwrap().result
    }

    #[test]
    fn test_history_title_names_source() {
        let report = report_with_source(Some(CashFlowSource::NetIncome));
        assert_eq!(
            history_title(&report),
            "Historical cash flows (Source: Net Income (not FCF, use with caution))"
        );
        let report = report_with_source(None);
        assert_eq!(history_title(&report), "Historical cash flows");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(dec!(1234567)), "1,234,567");
        assert_eq!(group_thousands(dec!(-1234.5)), "-1,234.5");
        assert_eq!(group_thousands(dec!(999)), "999");
    }

    #[test]
    fn test_fmt_price() {
        assert_eq!(fmt_price(dec!(1234.567)), "1,234.57");
        assert_eq!(fmt_price(dec!(0.0028863)), "0.0029");
        assert_eq!(fmt_price(dec!(12)), "12.00");
    }

    #[test]
    fn test_fmt_pct() {
        assert_eq!(fmt_pct(dec!(0.105)), "10.50%");
    }
}
