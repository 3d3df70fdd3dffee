// src/fetch/rates.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

/// Exchange rates relative to one base currency, keyed by currency code.
/// Built once from a service response and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTable {
    base: String,
    rates: BTreeMap<String, f64>,
}

impl RateTable {
    /// Keeps only positive finite rates; anything else is dropped with a
    /// warning so that code behaves like an unknown one.
    pub fn new(base: impl Into<String>, rates: impl IntoIterator<Item = (String, f64)>) -> Self {
        let mut kept = BTreeMap::new();
        for (code, rate) in rates {
            if rate.is_finite() && rate > 0.0 {
                kept.insert(code, rate);
            } else {
                warn!(%code, rate, "dropping non-positive rate");
            }
        }
        Self {
            base: base.into(),
            rates: kept,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Envelope returned by open.er-api.com; only `rates` is mandatory.
#[derive(Debug, Deserialize)]
struct RateResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    time_last_update_utc: Option<String>,
    rates: Option<BTreeMap<String, f64>>,
}

/// Turn a response body into a `RateTable`, checking the service envelope
/// against the requested base currency.
pub fn parse_rate_response(url: &str, base_currency: &str, body: &str) -> Result<RateTable> {
    let malformed = |reason: String| PipelineError::MalformedRates {
        url: url.to_string(),
        reason,
    };

    let resp: RateResponse = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    if resp.result.as_deref() == Some("error") {
        return Err(PipelineError::Service {
            url: url.to_string(),
            reason: resp.error_type.unwrap_or_else(|| "unspecified".into()),
        });
    }

    if let Some(code) = &resp.base_code {
        if !code.eq_ignore_ascii_case(base_currency) {
            return Err(malformed(format!(
                "asked for base {} but got {}",
                base_currency, code
            )));
        }
    }

    let rates = resp
        .rates
        .ok_or_else(|| malformed("no `rates` object in response".into()))?;

    if let Some(updated) = &resp.time_last_update_utc {
        info!(base = base_currency, %updated, "rates last updated");
    }

    Ok(RateTable::new(base_currency, rates))
}
