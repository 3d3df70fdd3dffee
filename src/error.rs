// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Every way a run can fail. All of them are fatal for the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("rate service at {url} reported an error: {reason}")]
    Service { url: String, reason: String },

    #[error("malformed rate response from {url}: {reason}")]
    MalformedRates { url: String, reason: String },

    #[error("reading report {path:?}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("report {path:?} has no `{column}` column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("report {path:?} has column `{column}` more than once")]
    DuplicateColumn { path: PathBuf, column: String },

    #[error("row {row}: budget value {value:?} is not a number")]
    InvalidBudget { row: usize, value: String },

    #[error("writing report {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse failure class, one per stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Service,
    Input,
    Output,
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Config(_) => ErrorCategory::Config,
            PipelineError::Request { .. }
            | PipelineError::Status { .. }
            | PipelineError::Service { .. }
            | PipelineError::MalformedRates { .. } => ErrorCategory::Service,
            PipelineError::Input { .. }
            | PipelineError::MissingColumn { .. }
            | PipelineError::DuplicateColumn { .. }
            | PipelineError::InvalidBudget { .. } => ErrorCategory::Input,
            PipelineError::Output { .. } => ErrorCategory::Output,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
