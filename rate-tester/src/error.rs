use std::time::Duration;

use thiserror::Error;

/// Rejected run settings. Always reported before the first request goes out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("requests per second must be > 0")]
    ZeroRate,

    #[error("{0} req/s leaves no time between launches")]
    RateTooHigh(u32),

    #[error("duration must be > 0 seconds")]
    ZeroDuration,

    #[error("per-request timeout must be > 0")]
    ZeroTimeout,

    #[error("invalid per-request timeout: {0}")]
    InvalidTimeout(String),

    #[error("max in-flight requests must be > 0 when set")]
    ZeroMaxInFlight,

    #[error("{rate} req/s for {duration_secs}s does not fit in a request count")]
    TooManyRequests { rate: u32, duration_secs: u64 },

    #[error("invalid target url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme in {0:?}, only http targets are supported")]
    UnsupportedScheme(String),
}

/// A response arrived but could not be counted as a success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("response is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("HTTP {status} error response is not valid JSON: {detail}")]
    MalformedErrorBody { status: u16, detail: String },
}

impl ApplicationError {
    /// The response body could not be parsed at all.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedBody(_) | Self::MalformedErrorBody { .. }
        )
    }
}

/// No usable response arrived.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to build request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Other(String),
}
