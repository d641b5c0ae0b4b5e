//! Engine configuration.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use finmate_common::Grouping;
use tracing::warn;

/// Rate feed settings.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL; the pivot code is appended as the last path segment.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent sent with each request.
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("finmate-fx/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Keys under which engine state is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Selected currency code.
    pub selected_currency: String,
    /// Serialized rate table.
    pub rates: String,
    /// Serialized fetch timestamp.
    pub rates_updated: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            selected_currency: "@finmate_currency".to_string(),
            rates: "@finmate_exchange_rates".to_string(),
            rates_updated: "@finmate_rates_updated".to_string(),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// File backing the store. `None` keeps state in memory only.
    pub path: Option<PathBuf>,
    /// Storage keys.
    pub keys: StorageKeys,
}

/// Main engine configuration.
#[derive(Debug, Clone, Default)]
pub struct FxConfig {
    /// Rate feed settings.
    pub feed: FeedConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Digit grouping for formatted amounts.
    pub grouping: Grouping,
}

impl FxConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("FINMATE_RATES_URL") {
            config.feed.base_url = url;
        }

        if let Ok(secs) = std::env::var("FINMATE_HTTP_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(secs) => config.feed.timeout = Duration::from_secs(secs),
                Err(_) => warn!(value = %secs, "Ignoring invalid FINMATE_HTTP_TIMEOUT_SECS"),
            }
        }

        if let Ok(path) = std::env::var("FINMATE_STORE_PATH") {
            config.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(grouping) = std::env::var("FINMATE_NUMBER_GROUPING") {
            match grouping.parse() {
                Ok(grouping) => config.grouping = grouping,
                Err(e) => warn!(error = %e, "Ignoring invalid FINMATE_NUMBER_GROUPING"),
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.feed.base_url.trim().is_empty() {
            return Err("Rate feed URL cannot be empty".to_string());
        }

        if self.feed.timeout.is_zero() {
            return Err("Rate feed timeout cannot be zero".to_string());
        }

        let keys = &self.storage.keys;
        let all = [&keys.selected_currency, &keys.rates, &keys.rates_updated];
        if all.iter().any(|k| k.is_empty()) {
            return Err("Storage keys cannot be empty".to_string());
        }
        if all.iter().collect::<HashSet<_>>().len() != all.len() {
            return Err("Storage keys must be distinct".to_string());
        }

        Ok(())
    }
}
