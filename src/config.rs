// src/config.rs

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};
use url::Url;

use crate::error::{PipelineError, Result};

pub const INPUT_FILE_PATH: &str = "sales_report_input.csv";
pub const OUTPUT_FILE_PATH: &str = "sales_report_output.csv";
pub const API_ADDRESS: &str = "https://open.er-api.com/v6/latest/";
pub const BASE_CURRENCY: &str = "EUR";

/// Optional override file, looked up in the working directory.
pub const CONFIG_FILE_PATH: &str = "fxreport.yaml";

/// Run settings. Every field has a built-in default, so the YAML file only
/// needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub api_address: String,
    pub base_currency: String,
    pub delimiter: char,
    /// Prepend an unnamed 0-based row position column to the output.
    pub write_row_index: bool,
    /// No explicit timeout when unset.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(INPUT_FILE_PATH),
            output_path: PathBuf::from(OUTPUT_FILE_PATH),
            api_address: API_ADDRESS.to_string(),
            base_currency: BASE_CURRENCY.to_string(),
            delimiter: ',',
            write_row_index: false,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Read `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("reading {}: {}", path.display(), e))
        })?;
        let cfg = Self::from_yaml(&text)?;
        info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // an empty document deserializes to unit, not to an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut cfg: Self =
            serde_yaml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        // the code also names the budget column, so `eur` must become `EUR`
        cfg.base_currency = cfg.base_currency.trim().to_ascii_uppercase();
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let code = &self.base_currency;
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(PipelineError::Config(format!(
                "base currency {:?} is not a three-letter upper-case code",
                code
            )));
        }

        let url = Url::parse(&self.api_address).map_err(|e| {
            PipelineError::Config(format!("api address {:?}: {}", self.api_address, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PipelineError::Config(format!(
                "api address {:?} must be http or https",
                self.api_address
            )));
        }

        if self.input_path == self.output_path {
            return Err(PipelineError::Config(format!(
                "input and output both point at {}",
                self.input_path.display()
            )));
        }

        self.delimiter_byte()?;
        Ok(())
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() && self.delimiter != '\n' && self.delimiter != '"' {
            Ok(self.delimiter as u8)
        } else {
            Err(PipelineError::Config(format!(
                "delimiter {:?} must be a single ASCII character",
                self.delimiter
            )))
        }
    }
}
