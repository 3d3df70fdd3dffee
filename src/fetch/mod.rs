// src/fetch/mod.rs

use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

pub mod rates;

pub use rates::{parse_rate_response, RateTable};

/// Fetches the rate table for a base currency from an open.er-api style
/// service: `GET <api_address>/<BASE>` answering `{"rates": {...}, ...}`.
pub struct RateFetcher {
    client: Client,
    api_address: String,
}

impl RateFetcher {
    /// `timeout` of `None` leaves the request without a deadline.
    pub fn new(api_address: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_address: api_address.into(),
        })
    }

    pub fn rates_url(&self, base_currency: &str) -> String {
        if self.api_address.ends_with('/') {
            format!("{}{}", self.api_address, base_currency)
        } else {
            format!("{}/{}", self.api_address, base_currency)
        }
    }

    /// One GET, no retry. Any transport, status or body problem is fatal.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn fetch(&self, base_currency: &str) -> Result<RateTable> {
        let url = self.rates_url(base_currency);
        debug!(%url, "requesting rates");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|source| PipelineError::Request {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Status { url, status });
        }

        let body = resp.text().map_err(|source| PipelineError::Request {
            url: url.clone(),
            source,
        })?;

        let table = parse_rate_response(&url, base_currency, &body)?;
        info!(%url, currencies = table.len(), "fetched rate table");
        Ok(table)
    }
}
