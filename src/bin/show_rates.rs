//! show_rates.rs
//!
//! Fetches the rate table the main pipeline would use (same config file,
//! same service, same base currency) and prints it as YAML, so a report's
//! `local_currency` codes can be checked against it before a run.

use anyhow::{Context, Result};
use fxreport::{config::CONFIG_FILE_PATH, Config, RateFetcher};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_or_default(CONFIG_FILE_PATH)?;
    config.validate()?;

    let fetcher = RateFetcher::new(
        config.api_address.as_str(),
        config.request_timeout_secs.map(Duration::from_secs),
    )?;
    let table = fetcher
        .fetch(&config.base_currency)
        .with_context(|| format!("fetching rates for {}", config.base_currency))?;
    info!(currencies = table.len(), "fetched");

    // base: EUR
    // rates:
    //   AED: 4.03
    //   ...
    let yaml = serde_yaml::to_string(&table)?;
    print!("{}", yaml);
    Ok(())
}
