//! Core library for the `converter` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The exchange rate provider abstraction
//! - The interactive conversion session and its history file
//!
//! It is used by `converter-cli`, but can also be driven by other front ends
//! since the session works over any `BufRead`/`Write` pair.

pub mod config;
pub mod convert;
pub mod error;
pub mod history;
pub mod model;
pub mod provider;
pub mod session;

pub use config::Config;
pub use convert::convert;
pub use error::InputError;
pub use history::HistoryStore;
pub use model::{ConversionRecord, RateTable, SupportedCurrency};
pub use provider::{RateProvider, provider_from_config};
pub use session::Session;
