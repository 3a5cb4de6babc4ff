//! Error types for pixfetch
//!
//! This module provides the error hierarchy used throughout the library:
//! - [`FetchError`] for network retrieval failures (including timeouts)
//! - [`DecodeError`] for bytes that cannot be turned into an image
//! - [`Error`], the crate-level error wrapping both plus configuration and lifecycle failures
//!
//! Both fetch and decode failures are terminal for the run that produced them.
//! Nothing in this crate retries.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for pixfetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pixfetch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "pool_workers")
        key: Option<String>,
    },

    /// Network retrieval failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Fetched bytes could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// HTTP client construction or transport error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shutdown in progress - not accepting new work
    #[error("shutdown in progress: not accepting new work")]
    ShuttingDown,
}

impl Error {
    /// Build a configuration error for the given key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Returns true if this error is a fetch timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Fetch(e) if e.is_timeout())
    }
}

/// Network retrieval errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not complete within its timeout
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout {
        /// The URL that was requested
        url: String,
        /// The timeout that was exceeded
        timeout: Duration,
    },

    /// The server answered with a non-success status
    #[error("request to {url} failed with HTTP status {status}")]
    Status {
        /// The URL that was requested
        url: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// Connection, TLS or body transfer failure
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The URL that was requested
        url: String,
        /// The underlying transport failure
        reason: String,
    },

    /// The run owning this request was superseded and its work cancelled
    #[error("request to {url} was cancelled")]
    Cancelled {
        /// The URL that was requested
        url: String,
    },
}

impl FetchError {
    /// Returns true if the request exceeded its timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    /// Classify a reqwest failure for the given request
    pub(crate) fn from_reqwest(url: &str, timeout: Duration, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
                timeout,
            };
        }
        if let Some(status) = e.status() {
            return FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }
        FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Image decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No bytes to decode
    #[error("empty input")]
    Empty,

    /// Bytes are not a supported, well-formed image
    #[error("malformed image data: {0}")]
    Malformed(String),

    /// Image exceeds the configured dimension limit
    #[error("image is {width}x{height}, exceeding the {limit} pixel limit")]
    TooLarge {
        /// Decoded width in pixels
        width: u32,
        /// Decoded height in pixels
        height: u32,
        /// Configured maximum for either dimension
        limit: u32,
    },
}
