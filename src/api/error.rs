//! API Error Types
//!
//! Errors from the marketplace REST API and their classification into
//! the three cases callers act on.

use thiserror::Error;

/// How a caller should react to a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The resource does not exist yet (e.g. booking not accepted)
    NotAvailable,
    /// Network or server trouble; trying again later may succeed
    Transient,
    /// Retrying cannot help (bad or expired token, rejected request)
    Fatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotAvailable => "not_available",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
        }
    }
}

/// Errors that can occur when talking to the marketplace API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authorized (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Not found")]
    NotFound,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Service unavailable")]
    Unavailable,

    #[error("Rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NotFound => ErrorKind::NotAvailable,
            ApiError::Timeout | ApiError::Unavailable | ApiError::RateLimited { .. } => {
                ErrorKind::Transient
            }
            ApiError::Api { status, .. } if *status >= 500 => ErrorKind::Transient,
            // a malformed request fails the same way every time
            ApiError::Request(e) if e.is_builder() || e.is_redirect() => ErrorKind::Fatal,
            ApiError::Request(_) => ErrorKind::Transient,
            ApiError::Unauthorized { .. } | ApiError::Api { .. } | ApiError::Decode(_) => {
                ErrorKind::Fatal
            }
        }
    }

    /// Map a transport-level reqwest failure
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Unavailable
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Request(err)
        }
    }

    /// Map a non-success HTTP status
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ApiError::Unauthorized { status },
            404 => ApiError::NotFound,
            429 => ApiError::RateLimited {
                retry_after_secs: None,
            },
            502..=504 => ApiError::Unavailable,
            _ => ApiError::Api { status, message },
        }
    }
}

/// Result type alias for API calls
pub type ApiResult<T> = Result<T, ApiError>;
