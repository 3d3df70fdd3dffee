//! Adds a local-currency budget column to a EUR sales report, using rates
//! fetched once per run from an open.er-api style exchange rate service.

pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod report;
pub mod transform;

pub use config::Config;
pub use error::{ErrorCategory, PipelineError};
pub use fetch::{RateFetcher, RateTable};
pub use pipeline::{run, RunSummary};
pub use report::Report;
