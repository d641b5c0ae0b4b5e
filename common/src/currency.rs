//! Currency types for FinMate.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// ISO 4217-style currency code, always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a new currency code, normalizing to upper-case.
    pub fn new(code: impl Into<String>) -> Self {
        let mut code = code.into();
        code.make_ascii_uppercase();
        Self(code.trim().to_string())
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the code looks like an ISO 4217 code (three ASCII letters).
    pub fn is_iso_like(&self) -> bool {
        self.0.len() == 3 && self.0.chars().all(|c| c.is_ascii_uppercase())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CurrencyCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for CurrencyCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CurrencyCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CurrencyCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A displayable currency: code, symbol and human-readable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// Unique currency code.
    pub code: CurrencyCode,
    /// Symbol prepended to formatted amounts.
    pub symbol: String,
    /// Display name.
    pub name: String,
}

impl Currency {
    /// Create a new currency.
    pub fn new(
        code: impl Into<CurrencyCode>,
        symbol: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    /// Get the currency code as a string slice.
    pub fn code(&self) -> &str {
        self.code.as_str()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.code, self.symbol, self.name)
    }
}
