//! Static catalog of supported currencies.

use std::collections::HashSet;

use crate::currency::{Currency, CurrencyCode};
use crate::error::CatalogError;

/// Built-in catalog entries. The first entry is the pivot currency.
const DEFAULT_CURRENCIES: &[(&str, &str, &str)] = &[
    ("INR", "₹", "Indian Rupee"),
    ("USD", "$", "US Dollar"),
    ("EUR", "€", "Euro"),
    ("GBP", "£", "British Pound"),
    ("JPY", "¥", "Japanese Yen"),
    ("AUD", "A$", "Australian Dollar"),
    ("CAD", "C$", "Canadian Dollar"),
    ("CHF", "Fr", "Swiss Franc"),
    ("CNY", "¥", "Chinese Yuan"),
    ("SGD", "S$", "Singapore Dollar"),
];

/// Immutable, ordered list of supported currencies.
///
/// The first entry is the pivot currency: every stored amount is
/// denominated in it and every cached rate is relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyCatalog {
    currencies: Vec<Currency>,
}

impl CurrencyCatalog {
    /// Build a catalog from an ordered list, pivot first.
    pub fn new(currencies: Vec<Currency>) -> Result<Self, CatalogError> {
        if currencies.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::with_capacity(currencies.len());
        for currency in &currencies {
            if currency.code.as_str().is_empty() {
                return Err(CatalogError::BlankCode);
            }
            if !seen.insert(currency.code.clone()) {
                return Err(CatalogError::DuplicateCode(currency.code.clone()));
            }
        }

        Ok(Self { currencies })
    }

    /// All currencies in catalog order.
    pub fn list(&self) -> &[Currency] {
        &self.currencies
    }

    /// Look up a currency by code (case-insensitive).
    pub fn find(&self, code: &str) -> Option<&Currency> {
        let code = CurrencyCode::new(code);
        self.currencies.iter().find(|c| c.code == code)
    }

    /// Check whether a code is listed.
    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    /// The pivot currency.
    pub fn pivot(&self) -> &Currency {
        // Construction guarantees at least one entry.
        &self.currencies[0]
    }

    /// Code of the pivot currency.
    pub fn pivot_code(&self) -> &CurrencyCode {
        &self.pivot().code
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

impl Default for CurrencyCatalog {
    fn default() -> Self {
        Self {
            currencies: DEFAULT_CURRENCIES
                .iter()
                .map(|(code, symbol, name)| Currency::new(*code, *symbol, *name))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_pivot_is_inr() {
        let catalog = CurrencyCatalog::default();
        assert_eq!(catalog.pivot().code, "INR");
        assert_eq!(catalog.pivot().symbol, "₹");
        assert_eq!(catalog.len(), 10);
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let catalog = CurrencyCatalog::default();
        let usd = catalog.find("usd").unwrap();
        assert_eq!(usd.name, "US Dollar");
        assert!(catalog.find("ZZZ").is_none());
    }

    #[test]
    fn test_list_preserves_order() {
        let catalog = CurrencyCatalog::default();
        let codes: Vec<&str> = catalog.list().iter().map(|c| c.code()).collect();
        assert_eq!(&codes[..3], &["INR", "USD", "EUR"]);
        assert_eq!(codes.last(), Some(&"SGD"));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert_eq!(CurrencyCatalog::new(vec![]), Err(CatalogError::Empty));

        let result = CurrencyCatalog::new(vec![
            Currency::new("USD", "$", "US Dollar"),
            Currency::new("usd", "$", "Another Dollar"),
        ]);
        assert_eq!(
            result,
            Err(CatalogError::DuplicateCode(CurrencyCode::new("USD")))
        );
    }

    #[test]
    fn test_custom_catalog_pivot_is_first() {
        let catalog = CurrencyCatalog::new(vec![
            Currency::new("EUR", "€", "Euro"),
            Currency::new("USD", "$", "US Dollar"),
        ])
        .unwrap();
        assert_eq!(catalog.pivot_code(), &CurrencyCode::new("EUR"));
    }
}
