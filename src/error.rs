//! Error types for the Warden service.

use thiserror::Error;

/// Main error type for Warden operations.
#[derive(Error, Debug)]
pub enum WardenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A limit that can never admit a request
    #[error("Invalid limit {limit} for endpoint '{endpoint}': limit must be at least 1")]
    InvalidLimit { endpoint: String, limit: u64 },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
