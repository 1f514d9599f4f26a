use thiserror::Error;

/// Recoverable errors raised while reading user input in the conversion loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// The code is not present in the fetched rate table.
    #[error("Unrecognized or unsupported currency: '{0}'")]
    UnknownCurrency(String),

    /// The amount is not a finite, non-negative number.
    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),
}
