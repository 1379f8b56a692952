//! Error types for the sensorgrid system.
//!
//! Row-level problems (a bad timestamp, a non-numeric cell, an empty
//! channel) are counted and reported, never raised; only
//! configuration-shaped misuse at the API boundary surfaces as `Err`.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the sensorgrid system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A timestamp string matched none of the supported patterns.
    #[error("Unparseable timestamp: {0:?}")]
    UnparseableTimestamp(String),

    /// A zone id did not resolve to a known IANA zone.
    #[error("Unknown time zone: {0:?}")]
    UnknownZone(String),

    /// Data error (invalid or inconsistent data).
    #[error("Data error: {0}")]
    Data(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }
}
