use chrono::NaiveDate;
use intrinsic_core::financials::{
    BalanceSheet, CashFlowSource, CashFlowStatement, CompanyFinancials, FinancialsInput,
    StatementFinancials, StatementPeriod,
};
use intrinsic_core::types::Currency;
use intrinsic_core::valuation::dcf::{valuate, ValuationAssumptions};
use intrinsic_core::valuation::terminal::TerminalValueMethod;
use rust_decimal_macros::dec;

fn statement_period(year: i32) -> StatementPeriod {
    StatementPeriod {
        period_end: NaiveDate::from_ymd_opt(year, 9, 30).unwrap(),
        free_cash_flow: None,
        operating_cash_flow: None,
        capital_expenditure: None,
        net_income: None,
    }
}

fn raw_financials() -> StatementFinancials {
    // Provider order is newest first
    let periods = [(2023, dec!(1331)), (2022, dec!(1210)), (2021, dec!(1100)), (2020, dec!(1000))]
        .into_iter()
        .map(|(year, ocf)| {
            let mut p = statement_period(year);
            p.operating_cash_flow = Some(ocf + dec!(100));
            p.capital_expenditure = Some(dec!(-100));
            p
        })
        .collect();

    StatementFinancials {
        ticker: Some("RAW".into()),
        company_name: "Raw Statements plc".into(),
        currency: Currency::GBP,
        shares_outstanding: dec!(100),
        statement: CashFlowStatement { periods },
        balance_sheet: Some(BalanceSheet {
            long_term_debt: Some(dec!(2000)),
            short_term_debt: None,
            cash: Some(dec!(500)),
        }),
        min_years: None,
    }
}

#[test]
fn test_statements_resolve_into_financials() {
    let financials = CompanyFinancials::from_statements(&raw_financials());

    assert_eq!(financials.cash_flow_source, Some(CashFlowSource::OperatingCashFlowLessCapex));
    assert_eq!(financials.net_debt, dec!(1500));
    assert_eq!(
        financials.historical.valid_values(),
        vec![dec!(1000), dec!(1100), dec!(1210), dec!(1331)]
    );
    assert_eq!(financials.historical.entries[0].period, "2020");
    assert_eq!(financials.caveats.len(), 1);
}

#[test]
fn test_fallback_caveat_reaches_output() {
    let financials = CompanyFinancials::from_statements(&raw_financials());
    let assumptions = ValuationAssumptions::new(
        dec!(0.09),
        3,
        TerminalValueMethod::ExitMultiple { multiple: dec!(15) },
    );
    let out = valuate(&financials, &assumptions).unwrap();

    assert!(out.warnings[0].starts_with("Fallback used"));
    assert_eq!(out.result.currency, Currency::GBP);
    assert_eq!(out.result.historical.len(), 4);
    assert_eq!(out.result.valuation.net_debt, dec!(1500));
}

#[test]
fn test_min_years_override() {
    let mut raw = raw_financials();
    raw.min_years = Some(5);
    let financials = CompanyFinancials::from_statements(&raw);
    assert!(financials.historical.is_empty());
    assert!(financials.cash_flow_source.is_none());
}

#[test]
fn test_json_statements_input() {
    let json = r#"{
        "ticker": "JSN",
        "company_name": "Json Co",
        "currency": "EUR",
        "shares_outstanding": "50",
        "statement": {
            "periods": [
                { "period_end": "2021-12-31", "free_cash_flow": "10" },
                { "period_end": "2022-12-31", "free_cash_flow": "12" },
                { "period_end": "2023-12-31", "free_cash_flow": "14" }
            ]
        }
    }"#;
    let input: FinancialsInput = serde_json::from_str(json).unwrap();
    let financials = input.into_financials();

    assert_eq!(financials.cash_flow_source, Some(CashFlowSource::FreeCashFlow));
    assert_eq!(financials.currency, Currency::EUR);
    assert_eq!(financials.historical.valid_values(), vec![dec!(10), dec!(12), dec!(14)]);
}
