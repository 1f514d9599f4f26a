use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::model::RateTable;

use super::RateProvider;

/// Client for the exchangerate-api.com v6 `latest` endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    base_currency: String,
    http: Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: String, base_currency: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            base_currency: base_currency.to_uppercase(),
            http: Client::new(),
        }
    }

    fn latest_url(&self) -> String {
        format!("{}/v6/{}/latest/{}", self.base_url, self.api_key, self.base_currency)
    }

    fn redacted_url(&self) -> String {
        format!("{}/v6/***/latest/{}", self.base_url, self.base_currency)
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    conversion_rates: Option<HashMap<String, f64>>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %self.base_currency))]
    async fn fetch_rates(&self) -> Result<RateTable> {
        let url = self.latest_url();
        debug!(url = %self.redacted_url(), "Requesting exchange rates");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to send request to ExchangeRate-API")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read ExchangeRate-API response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "ExchangeRate-API request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: LatestResponse =
            serde_json::from_str(&body).context("Failed to parse ExchangeRate-API JSON")?;

        if let Some(result) = parsed.result.as_deref().filter(|r| *r != "success") {
            return Err(anyhow!(
                "ExchangeRate-API returned result '{}': {}",
                result,
                parsed.error_type.as_deref().unwrap_or("unknown error"),
            ));
        }

        let rates = parsed
            .conversion_rates
            .ok_or_else(|| anyhow!("ExchangeRate-API response contained no conversion_rates"))?;

        let base = parsed.base_code.unwrap_or_else(|| self.base_currency.clone());
        let table = RateTable::new(base, rates);
        info!(count = table.len(), base = table.base(), "Fetched exchange rates");

        Ok(table)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
