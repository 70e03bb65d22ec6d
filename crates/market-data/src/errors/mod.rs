//! Error types and failure classification for source adapters.
//!
//! This module provides:
//! - [`FetchError`]: The main error enum for all adapter operations
//! - [`FetchClass`]: Classification for determining orchestrator behavior

mod class;

pub use class::FetchClass;

use thiserror::Error;

/// Errors that can occur while fetching data from an external source.
///
/// Each variant is classified into a [`FetchClass`] via the
/// [`class`](Self::class) method, which determines how the collection
/// orchestrator handles the failure: abort, retry with backoff, or tally
/// and continue.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The symbol does not match the adapter's market convention
    /// (e.g., an alphabetic ticker given to a numeric-code-only adapter).
    /// This is a caller error and is never retried.
    #[error("Symbol format not recognized: {0}")]
    InvalidSymbol(String),

    /// The adapter does not implement the requested capability.
    #[error("Operation not supported: {operation} ({provider})")]
    NotSupported {
        /// The capability that was requested
        operation: String,
        /// The adapter that does not support it
        provider: String,
    },

    /// The provider does not know the requested symbol.
    /// Terminal for this provider - retrying won't help.
    #[error("Symbol not found: {symbol} ({provider})")]
    SymbolNotFound { symbol: String, provider: String },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited { provider: String },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// The provider answered with an unexpected HTTP status.
    #[error("Upstream status {status}: {provider}")]
    UpstreamStatus { provider: String, status: u16 },

    /// The provider's response could not be parsed into the expected
    /// provider-native shape.
    #[error("Unexpected response shape: {provider} - {message}")]
    UnexpectedShape { provider: String, message: String },

    /// A provider-specific failure that fits no other variant
    /// (library errors, broken auth handshakes).
    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    /// Returns the failure classification for this error.
    ///
    /// - [`FetchClass::Format`]: caller error, surfaced immediately
    /// - [`FetchClass::Transient`]: retried a small fixed number of times
    ///   with backoff, else counted as a per-item failure
    /// - [`FetchClass::Permanent`]: aborts the listing phase, or is counted
    ///   as a per-item failure in the per-item phase
    pub fn class(&self) -> FetchClass {
        match self {
            Self::InvalidSymbol(_) => FetchClass::Format,

            Self::RateLimited { .. } | Self::Timeout { .. } => FetchClass::Transient,

            // 5xx is worth retrying, any other unexpected status is not.
            Self::UpstreamStatus { status, .. } => {
                if *status >= 500 {
                    FetchClass::Transient
                } else {
                    FetchClass::Permanent
                }
            }

            Self::Network(e) => {
                if e.is_timeout() || e.is_connect() {
                    FetchClass::Transient
                } else {
                    FetchClass::Permanent
                }
            }

            Self::NotSupported { .. }
            | Self::SymbolNotFound { .. }
            | Self::UnexpectedShape { .. }
            | Self::Provider { .. } => FetchClass::Permanent,
        }
    }

    /// Map an HTTP status from a provider response into an error.
    pub fn from_status(provider: &str, status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited {
                provider: provider.to_string(),
            }
        } else {
            Self::UpstreamStatus {
                provider: provider.to_string(),
                status: status.as_u16(),
            }
        }
    }

    /// Classify a reqwest transport error, folding timeouts into
    /// [`FetchError::Timeout`] so the orchestrator sees them uniformly.
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else {
            Self::Network(err)
        }
    }
}
