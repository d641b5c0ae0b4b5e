//! FinMate Common Types
//!
//! Shared value types for the FinMate currency engine: currencies and the
//! static catalog, pivot-relative rate tables and snapshots, and the digit
//! grouping styles used when formatting amounts.

pub mod catalog;
pub mod currency;
pub mod error;
pub mod format;
pub mod rates;

pub use catalog::*;
pub use currency::*;
pub use error::*;
pub use format::*;
pub use rates::*;
