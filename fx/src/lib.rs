//! FinMate FX Engine
//!
//! Currency conversion and rate caching for displaying pivot-denominated
//! amounts in a user-selected currency.
//!
//! # Features
//!
//! - Pivot-relative rate table refreshed from an HTTP feed on request
//! - Cached rates persisted through a pluggable key-value store, so the
//!   engine keeps working offline
//! - Failed refreshes never disturb the last good rates
//! - Locale-aware formatting with the currency symbol
//!
//! # Example
//!
//! ```rust,ignore
//! use finmate_fx::{CurrencyFacade, FxConfig};
//!
//! let facade = CurrencyFacade::from_config(&FxConfig::from_env())?;
//! let _refresh = facade.initialize().await;
//!
//! facade.select_currency("USD").await?;
//! println!("{}", facade.format_amount(1500.0, None));
//! ```

pub mod cache;
pub mod config;
pub mod conversion;
pub mod error;
pub mod facade;
pub mod feed;
pub mod store;

pub use cache::{CacheStats, RateCache};
pub use config::{FeedConfig, FxConfig, StorageConfig, StorageKeys};
pub use error::{FetchError, FxError, FxResult, StoreError};
pub use facade::CurrencyFacade;
pub use feed::{FeedResponse, HttpRateFeed, RateFeed};
pub use store::{FileStore, KeyValueStore, MemoryStore};

#[cfg(any(test, feature = "test-utils"))]
pub use feed::MockRateFeed;
#[cfg(any(test, feature = "test-utils"))]
pub use store::FlakyStore;
