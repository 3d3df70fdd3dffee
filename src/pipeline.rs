// src/pipeline.rs

use std::{path::PathBuf, time::Duration};
use tracing::info;

use crate::{
    config::Config,
    error::Result,
    fetch::{RateFetcher, RateTable},
    report::{self, budget_column, LOCAL_CURRENCY_COLUMN},
    transform::{self, ConversionSummary},
};

/// Outcome of one successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub currencies: usize,
    pub output_path: PathBuf,
    pub conversion: ConversionSummary,
}

/// Fetch rates, then convert the configured report. Nothing is written
/// unless every step before the write succeeds.
pub fn run(config: &Config) -> Result<RunSummary> {
    config.validate()?;

    let fetcher = RateFetcher::new(
        config.api_address.as_str(),
        config.request_timeout_secs.map(Duration::from_secs),
    )?;
    let rates = fetcher.fetch(&config.base_currency)?;

    convert_report(config, &rates)
}

/// The load → transform → write half of a run, for an already fetched table.
pub fn convert_report(config: &Config, rates: &RateTable) -> Result<RunSummary> {
    let delimiter = config.delimiter_byte()?;
    let budget_col = budget_column(rates.base());

    let input = report::load_report(
        &config.input_path,
        delimiter,
        &[budget_col.as_str(), LOCAL_CURRENCY_COLUMN],
    )?;
    info!(
        path = %config.input_path.display(),
        rows = input.len(),
        "loaded report"
    );

    let (output, conversion) =
        transform::add_local_budget(input, &budget_col, LOCAL_CURRENCY_COLUMN, rates)?;

    report::write_report(
        &output,
        &config.output_path,
        delimiter,
        config.write_row_index,
    )?;

    Ok(RunSummary {
        rows: output.len(),
        currencies: rates.len(),
        output_path: config.output_path.clone(),
        conversion,
    })
}
