//! Error types shared by econ-watch crates.

use thiserror::Error;

/// Result type alias using the shared error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Service-level errors, each mapped to an HTTP status.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing credential, bad offset, unparsable setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or wrong shared secret
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Unknown indicator code and similar
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No indicator data could be fetched for a cycle
    #[error("No data available: {0}")]
    NoData(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Auth(_) => 401,
            Self::InvalidInput(_) => 400,
            Self::NoData(_) => 503,
            Self::Config(_) => 500,
        }
    }
}
