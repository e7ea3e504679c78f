//! Error types

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Price out of range: {0}")]
    PriceOutOfRange(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Price feed errors
#[derive(Debug, Error)]
pub enum PriceFeedError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Unexpected HTTP status {status} from {source_name}")]
    BadStatus { source_name: String, status: u16 },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Missing field {field} in response from {source_name}")]
    MissingField { source_name: String, field: &'static str },

    #[error("Rate limited")]
    RateLimited,
}

/// Settings store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store contents: {0}")]
    Corrupt(String),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
pub type PriceFeedResult<T> = Result<T, PriceFeedError>;
pub type StoreResult<T> = Result<T, StoreError>;
