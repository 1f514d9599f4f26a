use crate::{Config, RateTable, provider::exchangerate_api::ExchangeRateApiProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod exchangerate_api;

#[async_trait]
pub trait RateProvider: Send + Sync + Debug {
    async fn fetch_rates(&self) -> anyhow::Result<RateTable>;
}

/// Construct the rate provider described by the config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn RateProvider>> {
    let api_key = config.require_api_key()?;

    Ok(Box::new(ExchangeRateApiProvider::new(
        &config.base_url,
        api_key.to_owned(),
        &config.base_currency,
    )))
}
