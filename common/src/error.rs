//! Error types for shared FinMate values.

use thiserror::Error;

use crate::currency::CurrencyCode;

/// Errors raised while building a currency catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A catalog needs at least the pivot currency.
    #[error("Currency catalog cannot be empty")]
    Empty,

    /// A currency with an empty code.
    #[error("Currency code cannot be blank")]
    BlankCode,

    /// The same code listed twice.
    #[error("Duplicate currency code: {0}")]
    DuplicateCode(CurrencyCode),
}

/// Error parsing a digit grouping style.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown number grouping: {0} (expected \"lakh\" or \"thousands\")")]
pub struct ParseGroupingError(pub String);
