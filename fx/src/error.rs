//! FX engine error types.

use thiserror::Error;

/// Errors from a single rate feed round-trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read.
    #[error("Rate feed transport error: {0}")]
    Transport(String),

    /// Feed answered with a non-success status.
    #[error("Rate feed returned HTTP {status}")]
    Status { status: u16 },

    /// Body was not the expected JSON payload.
    #[error("Malformed rate feed response: {0}")]
    Decode(String),

    /// Response held no usable rates.
    #[error("Rate feed returned no usable rates")]
    EmptyRates,

    /// Response was quoted against a different base currency.
    #[error("Rate feed base mismatch: expected {expected}, got {actual}")]
    BaseMismatch { expected: String, actual: String },

    /// HTTP client could not be built.
    #[error("Rate feed client error: {0}")]
    Client(String),
}

/// Errors from the key-value store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying storage could not be read or written.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// Stored data could not be encoded or decoded.
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors that can occur in the FX engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FxError {
    /// Refreshing rates failed; cached rates are unchanged.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Reading or writing persisted state failed.
    #[error(transparent)]
    Persistence(#[from] StoreError),

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FxError {
    /// Check if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FxError::Fetch(FetchError::Transport(_)) => true,
            FxError::Fetch(FetchError::Status { status }) => *status >= 500 || *status == 429,
            FxError::Persistence(StoreError::Io(_)) => true,
            _ => false,
        }
    }

    /// Stable error code for display layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::Fetch(_) => "FETCH_FAILURE",
            FxError::Persistence(_) => "PERSISTENCE_FAILURE",
            FxError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FxError::from(FetchError::Transport("reset".into())).is_retryable());
        assert!(FxError::from(FetchError::Status { status: 503 }).is_retryable());
        assert!(FxError::from(FetchError::Status { status: 429 }).is_retryable());
        assert!(!FxError::from(FetchError::Status { status: 404 }).is_retryable());
        assert!(!FxError::from(FetchError::Decode("eof".into())).is_retryable());
        assert!(!FxError::Configuration("bad".into()).is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            FxError::from(FetchError::EmptyRates).error_code(),
            "FETCH_FAILURE"
        );
        assert_eq!(
            FxError::from(StoreError::Io("disk full".into())).error_code(),
            "PERSISTENCE_FAILURE"
        );
    }

    #[test]
    fn test_display_is_transparent() {
        let err = FxError::from(FetchError::Status { status: 502 });
        assert_eq!(err.to_string(), "Rate feed returned HTTP 502");
    }
}
