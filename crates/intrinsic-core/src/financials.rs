use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{CashFlowSeries, Currency, HistoricalCashFlow, Money};

/// Minimum number of valid periods a statement line needs before it is
/// accepted as the historical cash-flow series.
pub const DEFAULT_MIN_HISTORY_YEARS: usize = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which statement line the historical series was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowSource {
    /// Reported free cash flow
    FreeCashFlow,
    /// Operating cash flow minus capital expenditure
    OperatingCashFlowLessCapex,
    /// Net income used as a proxy; not a cash measure
    NetIncome,
}

impl CashFlowSource {
    pub fn description(&self) -> &'static str {
        match self {
            CashFlowSource::FreeCashFlow => "Free Cash Flow",
            CashFlowSource::OperatingCashFlowLessCapex => "Operating Cash Flow - Capital Expenditure",
            CashFlowSource::NetIncome => "Net Income (not FCF, use with caution)",
        }
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self, CashFlowSource::FreeCashFlow)
    }
}

/// One fiscal period of a cash flow statement. Any line may be missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub period_end: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_cash_flow: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_cash_flow: Option<Money>,
    /// Reported either as a positive spend or a negative outflow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_expenditure: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_income: Option<Money>,
}

/// Annual cash flow statement, periods in any order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub periods: Vec<StatementPeriod>,
}

/// Balance sheet lines needed for the equity bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_term_debt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_term_debt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash: Option<Money>,
}

/// Historical series picked from a statement, with the line it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCashFlows {
    pub series: CashFlowSeries,
    pub source: Option<CashFlowSource>,
    pub caveats: Vec<String>,
}

/// Everything the valuation needs about a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyFinancials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    pub company_name: String,
    #[serde(default)]
    pub currency: Currency,
    pub shares_outstanding: Decimal,
    #[serde(default)]
    pub net_debt: Money,
    /// Chronological, oldest first
    pub historical: CashFlowSeries,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_flow_source: Option<CashFlowSource>,
    /// Human-readable notes from the data layer (fallbacks used, gaps)
    #[serde(default)]
    pub caveats: Vec<String>,
}

/// Raw statements as a data provider would return them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementFinancials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    pub company_name: String,
    #[serde(default)]
    pub currency: Currency,
    pub shares_outstanding: Decimal,
    pub statement: CashFlowStatement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_sheet: Option<BalanceSheet>,
    /// Minimum valid periods per line (default 3)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_years: Option<usize>,
}

/// Either shape of financials input accepted by the CLI and bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinancialsInput {
    Statements(StatementFinancials),
    Resolved(CompanyFinancials),
}

impl FinancialsInput {
    pub fn into_financials(self) -> CompanyFinancials {
        match self {
            FinancialsInput::Statements(raw) => CompanyFinancials::from_statements(&raw),
            FinancialsInput::Resolved(resolved) => resolved,
        }
    }
}

impl CompanyFinancials {
    /// Build from raw statements: pick the cash-flow line and derive net debt.
    pub fn from_statements(raw: &StatementFinancials) -> Self {
        let min_years = raw.min_years.unwrap_or(DEFAULT_MIN_HISTORY_YEARS);
        let resolved = resolve_cash_flows(&raw.statement, min_years);

        CompanyFinancials {
            ticker: raw.ticker.clone(),
            company_name: raw.company_name.clone(),
            currency: raw.currency.clone(),
            shares_outstanding: raw.shares_outstanding,
            net_debt: net_debt(raw.balance_sheet.as_ref()),
            historical: resolved.series,
            cash_flow_source: resolved.source,
            caveats: resolved.caveats,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Pick the first statement line with at least `min_years` valid periods,
/// trying free cash flow, then operating cash flow less capex, then net
/// income. Periods are returned oldest first and labelled by fiscal year.
pub fn resolve_cash_flows(statement: &CashFlowStatement, min_years: usize) -> ResolvedCashFlows {
    let mut caveats = Vec::new();

    if statement.periods.is_empty() {
        caveats.push("No cash flow statement data found.".to_string());
        return ResolvedCashFlows {
            series: CashFlowSeries::default(),
            source: None,
            caveats,
        };
    }

    let mut periods: Vec<&StatementPeriod> = statement.periods.iter().collect();
    periods.sort_by_key(|p| p.period_end);

    let candidates = [
        CashFlowSource::FreeCashFlow,
        CashFlowSource::OperatingCashFlowLessCapex,
        CashFlowSource::NetIncome,
    ];

    for source in candidates {
        let series = extract_line(&periods, source);
        let valid = series.entries.len();
        if valid < min_years {
            debug!(?source, valid, min_years, "statement line rejected");
            continue;
        }

        match source {
            CashFlowSource::FreeCashFlow => {}
            CashFlowSource::OperatingCashFlowLessCapex => caveats.push(
                "Fallback used: operating cash flow less capital expenditure (free cash flow unavailable)."
                    .to_string(),
            ),
            CashFlowSource::NetIncome => {
                warn!("falling back to net income as cash flow proxy");
                caveats.push(
                    "Used Net Income as cash flow proxy (FCF unavailable). Results may be less reliable."
                        .to_string(),
                );
            }
        }

        debug!(?source, periods = valid, "resolved historical cash flows");
        return ResolvedCashFlows {
            series,
            source: Some(source),
            caveats,
        };
    }

    caveats.push(
        "No valid FCF, Operating Cash Flow, or Net Income found in cash flow statement.".to_string(),
    );
    ResolvedCashFlows {
        series: CashFlowSeries::default(),
        source: None,
        caveats,
    }
}

/// Net debt = long-term debt + short-term debt - cash. Missing lines count
/// as zero; a missing balance sheet gives zero net debt.
pub fn net_debt(balance_sheet: Option<&BalanceSheet>) -> Money {
    match balance_sheet {
        Some(bs) => {
            bs.long_term_debt.unwrap_or(Decimal::ZERO) + bs.short_term_debt.unwrap_or(Decimal::ZERO)
                - bs.cash.unwrap_or(Decimal::ZERO)
        }
        None => Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn extract_line(periods: &[&StatementPeriod], source: CashFlowSource) -> CashFlowSeries {
    let entries = periods
        .iter()
        .filter_map(|p| {
            let value = match source {
                CashFlowSource::FreeCashFlow => p.free_cash_flow,
                CashFlowSource::OperatingCashFlowLessCapex => {
                    match (p.operating_cash_flow, p.capital_expenditure) {
                        (Some(ocf), Some(capex)) => Some(ocf - capex.abs()),
                        _ => None,
                    }
                }
                CashFlowSource::NetIncome => p.net_income,
            }?;
            Some(HistoricalCashFlow {
                period: p.period_end.year().to_string(),
                value: Some(value),
            })
        })
        .collect();

    CashFlowSeries { entries }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
