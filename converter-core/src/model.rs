use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::error::InputError;

/// Exchange rates keyed by uppercase currency code, all relative to `base`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: String,
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Build a table, dropping entries whose rate is not finite and positive.
    pub fn new(base: impl Into<String>, rates: HashMap<String, f64>) -> Self {
        let rates = rates
            .into_iter()
            .filter_map(|(code, rate)| {
                if rate.is_finite() && rate > 0.0 {
                    Some((code.to_uppercase(), rate))
                } else {
                    warn!(%code, rate, "Dropping unusable exchange rate");
                    None
                }
            })
            .collect();

        Self { base: base.into().to_uppercase(), rates }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rates.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Look up both rates of a conversion; codes must already be normalized.
    pub fn rate_pair(&self, from: &str, to: &str) -> Result<(f64, f64), InputError> {
        let from_rate =
            self.get(from).ok_or_else(|| InputError::UnknownCurrency(from.to_string()))?;
        let to_rate = self.get(to).ok_or_else(|| InputError::UnknownCurrency(to.to_string()))?;
        Ok((from_rate, to_rate))
    }
}

/// Currencies advertised in the prompts.
///
/// Validation goes through [`RateTable`], so a code listed here can still be
/// rejected when the remote table lacks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedCurrency {
    Usd,
    Eur,
    Brl,
    Ars,
    Gbp,
}

impl SupportedCurrency {
    pub fn code(&self) -> &'static str {
        match self {
            SupportedCurrency::Usd => "USD",
            SupportedCurrency::Eur => "EUR",
            SupportedCurrency::Brl => "BRL",
            SupportedCurrency::Ars => "ARS",
            SupportedCurrency::Gbp => "GBP",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SupportedCurrency::Usd => "US Dollar",
            SupportedCurrency::Eur => "Euro",
            SupportedCurrency::Brl => "Brazilian Real",
            SupportedCurrency::Ars => "Argentine Peso",
            SupportedCurrency::Gbp => "British Pound",
        }
    }

    pub const fn all() -> &'static [SupportedCurrency] {
        &[
            SupportedCurrency::Usd,
            SupportedCurrency::Eur,
            SupportedCurrency::Brl,
            SupportedCurrency::Ars,
            SupportedCurrency::Gbp,
        ]
    }
}

impl std::fmt::Display for SupportedCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// One completed conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    #[serde(rename = "date", with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub from_currency: String,
    pub from_amount: f64,
    pub to_currency: String,
    pub to_amount: f64,
}

/// `YYYY-MM-DD HH:MM:SS` (de)serialization for record timestamps.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
