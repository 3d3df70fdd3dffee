// src/transform.rs

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::{
    error::{PipelineError, Result},
    fetch::RateTable,
    report::{Report, LOCAL_BUDGET_COLUMN},
};

/// Cell values read as "no budget" rather than as a parse failure. Same set
/// a dataframe CSV reader treats as missing by default.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// What happened to the rows of one report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionSummary {
    pub converted: usize,
    pub missing_budget: usize,
    pub unknown_currency: usize,
    pub unknown_codes: BTreeSet<String>,
}

/// Parse one budget cell. `row` is the 1-based data row, for the error.
pub fn parse_budget(raw: &str, row: usize) -> Result<Option<f64>> {
    let cell = raw.trim();
    if MISSING_MARKERS.contains(&cell) {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(PipelineError::InvalidBudget {
            row,
            value: raw.to_string(),
        }),
    }
}

/// Render a derived value the way a dataframe writer would: shortest
/// round-trip digits, `110.0` rather than `110`, scientific form with a
/// signed two-digit exponent outside `1e-4..1e16` (`1e+16`, `1e-05`),
/// empty for missing.
pub fn format_amount(value: Option<f64>) -> String {
    let v = match value {
        Some(v) => v,
        None => return String::new(),
    };

    // `{:e}` gives the shortest round-trip mantissa, e.g. "1.5e16"
    let sci = format!("{:e}", v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if v != 0.0 && !(-4..16).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exp.abs());
    }

    let plain = v.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

/// Local-currency budget for every row, in row order. `None` where the
/// budget is missing or the row's currency has no rate.
pub fn local_budgets(
    report: &Report,
    budget_column: &str,
    currency_column: &str,
    rates: &RateTable,
) -> Result<(Vec<Option<f64>>, ConversionSummary)> {
    let (budget_idx, currency_idx) = match (
        report.column_index(budget_column),
        report.column_index(currency_column),
    ) {
        (Some(b), Some(c)) => (b, c),
        (None, _) => return Err(missing(budget_column)),
        (_, None) => return Err(missing(currency_column)),
    };

    let mut summary = ConversionSummary::default();
    let mut values = Vec::with_capacity(report.len());

    for (i, row) in report.rows.iter().enumerate() {
        let budget = parse_budget(&row[budget_idx], i + 1)?;
        let code = row[currency_idx].trim();
        let rate = rates.get(code);

        if rate.is_none() {
            summary.unknown_currency += 1;
            if summary.unknown_codes.insert(code.to_string()) {
                warn!(code, base = rates.base(), "no rate for currency, leaving value empty");
            }
        }

        let value = match (budget, rate) {
            (Some(b), Some(r)) => {
                summary.converted += 1;
                Some(b * r)
            }
            (None, _) => {
                summary.missing_budget += 1;
                None
            }
            (Some(_), None) => None,
        };
        values.push(value);
    }

    debug!(
        converted = summary.converted,
        missing_budget = summary.missing_budget,
        unknown_currency = summary.unknown_currency,
        "computed local budgets"
    );
    Ok((values, summary))
}

/// Append `budget_local_currency` to `report`. Row order and every existing
/// cell are left as they are.
pub fn add_local_budget(
    mut report: Report,
    budget_column: &str,
    currency_column: &str,
    rates: &RateTable,
) -> Result<(Report, ConversionSummary)> {
    let (values, summary) = local_budgets(&report, budget_column, currency_column, rates)?;
    report.push_column(
        LOCAL_BUDGET_COLUMN,
        values.into_iter().map(format_amount).collect(),
    );
    Ok((report, summary))
}

fn missing(column: &str) -> PipelineError {
    PipelineError::MissingColumn {
        path: "<in-memory report>".into(),
        column: column.to_string(),
    }
}
