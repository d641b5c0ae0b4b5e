//! Exchange rate tables and snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::currency::CurrencyCode;

/// Rate applied to any code missing from a table.
pub const DEFAULT_RATE: f64 = 1.0;

/// Pivot-relative exchange rates: `1 pivot = rate units` of each currency.
///
/// The pivot entry is always exactly `1.0`; constructors inject or overwrite
/// it. Non-finite and non-positive rates never enter the table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateTable {
    pivot: CurrencyCode,
    rates: BTreeMap<CurrencyCode, f64>,
}

impl ExchangeRateTable {
    /// A table holding only the pivot.
    pub fn pivot_only(pivot: CurrencyCode) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(pivot.clone(), DEFAULT_RATE);
        Self { pivot, rates }
    }

    /// Build a table from raw entries.
    ///
    /// Invalid rates are skipped and the pivot is forced to `1.0`.
    pub fn new<I, K>(pivot: CurrencyCode, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<CurrencyCode>,
    {
        let mut rates: BTreeMap<CurrencyCode, f64> = entries
            .into_iter()
            .map(|(code, rate)| (code.into(), rate))
            .filter(|(_, rate)| is_valid_rate(*rate))
            .collect();
        rates.insert(pivot.clone(), DEFAULT_RATE);
        Self { pivot, rates }
    }

    /// Parse a persisted table: a flat JSON object of code to number.
    pub fn from_json(pivot: CurrencyCode, json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<CurrencyCode, f64> = serde_json::from_str(json)?;
        Ok(Self::new(pivot, raw))
    }

    /// Serialize to the persisted flat JSON object form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.rates)
    }

    /// The pivot code.
    pub fn pivot(&self) -> &CurrencyCode {
        &self.pivot
    }

    /// Raw lookup. `None` when the code is absent. Codes match case-insensitively.
    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(&CurrencyCode::new(code)).copied()
    }

    /// Total lookup: the listed rate, or [`DEFAULT_RATE`] for unknown codes.
    pub fn rate(&self, code: &str) -> f64 {
        let code = CurrencyCode::new(code);
        if self.pivot == code {
            return DEFAULT_RATE;
        }
        match self.rates.get(&code) {
            Some(rate) => *rate,
            None => DEFAULT_RATE,
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rates.contains_key(&CurrencyCode::new(code))
    }

    /// Iterate entries in code order, pivot included.
    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, f64)> {
        self.rates.iter().map(|(code, rate)| (code, *rate))
    }

    /// Number of entries, pivot included.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// True when nothing but the pivot is known.
    pub fn is_pivot_only(&self) -> bool {
        self.rates.len() == 1
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Whether a value may be used as a rate.
pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// A rate table together with when it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    /// The rates.
    pub table: ExchangeRateTable,
    /// Time of the fetch that produced the table, if any ever succeeded.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl RateSnapshot {
    /// Create a new snapshot.
    pub fn new(table: ExchangeRateTable, fetched_at: Option<DateTime<Utc>>) -> Self {
        Self { table, fetched_at }
    }

    /// The snapshot used before anything has been loaded or fetched.
    pub fn empty(pivot: CurrencyCode) -> Self {
        Self {
            table: ExchangeRateTable::pivot_only(pivot),
            fetched_at: None,
        }
    }

    /// The pivot code of the underlying table.
    pub fn pivot(&self) -> &CurrencyCode {
        self.table.pivot()
    }

    /// Rate for a code, defaulting to `1.0` when unknown.
    pub fn rate(&self, code: &str) -> f64 {
        self.table.rate(code)
    }

    /// Whether any fetch has ever succeeded for this snapshot.
    pub fn has_fetched(&self) -> bool {
        self.fetched_at.is_some()
    }
}

/// Wire shape of a persisted fetch timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimestamp(pub DateTime<Utc>);

impl FetchTimestamp {
    /// Render as an RFC 3339 string.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    /// Parse an RFC 3339 / ISO-8601 string.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self(DateTime::parse_from_rfc3339(s.trim())?.with_timezone(&Utc)))
    }
}
