//! Error types for the range-relay gateway

use std::time::Duration;

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Error types that can occur while relaying object bytes
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Region {region} rejected the imported authorization bytes")]
    InvalidAuthBytes { region: u8 },

    #[error("Chunk fetch failed: {0}")]
    FetchFailed(String),

    #[error("Rate limited by backend, retry after {seconds}s")]
    RateLimited { seconds: u64 },

    #[error("Network timeout: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::IoError(err.to_string())
    }
}

impl From<http::Error> for RelayError {
    fn from(err: http::Error) -> Self {
        RelayError::HttpError(err.to_string())
    }
}

impl RelayError {
    /// Determine if this error should trigger a retry
    ///
    /// Returns true only for errors that are transient on control paths:
    /// - Backend rate limits (retry after the advertised delay)
    /// - Rejected authorization bytes during a cross-region handshake
    ///
    /// Everything else is permanent for the request at hand. Chunk fetch
    /// failures in particular are never retried mid-stream: by the time a
    /// chunk fails the response headers are already committed.
    pub fn should_retry(&self) -> bool {
        match self {
            RelayError::RateLimited { .. } => true,
            RelayError::InvalidAuthBytes { .. } => true,

            RelayError::BadRequest(_) => false,
            RelayError::NotFound(_) => false,
            RelayError::AuthFailure(_) => false,
            RelayError::FetchFailed(_) => false,
            RelayError::Timeout(_) => false,
            RelayError::HttpError(_) => false,
            RelayError::IoError(_) => false,
            RelayError::ConfigError(_) => false,
            RelayError::InternalError(_) => false,
        }
    }

    /// Backend-advertised delay before the next attempt, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RelayError::RateLimited { seconds } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }

    /// Convert error to HTTP status code
    ///
    /// Malformed requests and missing objects both map to 404: the gateway
    /// does not distinguish "never existed" from "you asked wrong", so the
    /// response leaks nothing about which identifiers are live. Backend
    /// failures surface as 502, timeouts as 504.
    pub fn to_http_status(&self) -> u16 {
        match self {
            RelayError::BadRequest(_) => 404,
            RelayError::NotFound(_) => 404,

            RelayError::AuthFailure(_) => 502,
            RelayError::InvalidAuthBytes { .. } => 502,
            RelayError::FetchFailed(_) => 502,
            RelayError::HttpError(_) => 502,

            RelayError::RateLimited { .. } => 503,
            RelayError::Timeout(_) => 504,

            RelayError::ConfigError(_) => 500,
            RelayError::IoError(_) => 500,
            RelayError::InternalError(_) => 500,
        }
    }

    /// Create a BadRequest error
    pub fn bad_request(message: impl Into<String>) -> Self {
        RelayError::BadRequest(message.into())
    }

    /// Create a NotFound error
    pub fn not_found(message: impl Into<String>) -> Self {
        RelayError::NotFound(message.into())
    }

    /// Create a FetchFailed error
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        RelayError::FetchFailed(message.into())
    }
}
