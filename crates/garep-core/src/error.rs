//! Error types and handling for garep-core operations.
//!
//! A single [`Error`] enum covers every failure the client can produce: disk
//! access for the caches, HTTP transport, Google API error responses, token
//! minting, discovery document resolution and configuration.
//!
//! ## Recovery Hints
//!
//! [`Error::is_recoverable`] marks the failures the retry layer treats as
//! transient. Everything else is returned to the caller on first sight.
//!
//! ```rust
//! use garep_core::Error;
//!
//! let throttled = Error::Api { status: 429, message: "Quota exceeded".into() };
//! assert!(throttled.is_recoverable());
//!
//! let bad_request = Error::Api { status: 400, message: "Unknown metric".into() };
//! assert!(!bad_request.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for garep-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers cache files, key files and configuration files. Timeouts and
    /// interrupted or reset streams are considered recoverable.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failed before a response could be read.
    ///
    /// Connection failures, timeouts and broken request/response bodies are
    /// recoverable; builder and redirect errors are not.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    ///
    /// `message` is taken from the Google error envelope when present.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Credentials could not be read or a token could not be minted.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A discovery document was malformed or lacked the requested method.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Converting to or from JSON/TOML failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A date string was not ISO 8601 `YYYY-MM-DD`.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A cache backend failed in a way that is not plain I/O.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Every retry attempt failed with a transient error.
    #[error("Gave up after {attempts} attempts: {last}")]
    RetryLimit {
        /// Number of calls made, including the first one.
        attempts: u32,
        /// The error returned by the final attempt.
        #[source]
        last: Box<Error>,
    },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the error is transient and worth retrying.
    ///
    /// - network: connect, timeout, request and body errors
    /// - API: 429 and every 5xx status
    /// - I/O: timed out, interrupted, reset, aborted, unexpected EOF
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Api { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// Get the error category as a static identifier for logs.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Api { .. } => "api",
            Self::Auth(_) => "auth",
            Self::Discovery(_) => "discovery",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::InvalidDate(_) => "invalid_date",
            Self::Cache(_) => "cache",
            Self::RetryLimit { .. } => "retry_limit",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
