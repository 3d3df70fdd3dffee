use anyhow::{Context, Result};
use fxreport::{config::CONFIG_FILE_PATH, pipeline, Config};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) settings ─────────────────────────────────────────────────
    let config = Config::load_or_default(CONFIG_FILE_PATH)
        .with_context(|| format!("loading {}", CONFIG_FILE_PATH))?;
    info!(
        input = %config.input_path.display(),
        output = %config.output_path.display(),
        base = %config.base_currency,
        "configured"
    );

    // ─── 3) fetch → load → convert → write ───────────────────────────
    let start = Instant::now();
    let summary = pipeline::run(&config).with_context(|| {
        format!(
            "converting {} to {}",
            config.input_path.display(),
            config.output_path.display()
        )
    })?;

    info!(
        rows = summary.rows,
        converted = summary.conversion.converted,
        unknown_currency = summary.conversion.unknown_currency,
        missing_budget = summary.conversion.missing_budget,
        currencies = summary.currencies,
        elapsed = ?start.elapsed(),
        "wrote {}",
        summary.output_path.display()
    );
    Ok(())
}
