//! Error types for asana-export
//!
//! Failures are layered the same way the export pipeline is:
//! - [`ApiError`] describes what went wrong with one call against one API path
//! - [`Error::Fetch`] adds the resource and operation being fetched
//! - [`Error::Export`] adds the export stage that was running
//!
//! Only a rate-limited response ([`ApiError::RateLimited`]) is ever retried.
//! Everything else surfaces on first occurrence and aborts the export.

use crate::client::rate_limit::RateLimitState;
use crate::throttle::GateClosed;
use crate::types::Stage;
use thiserror::Error;

/// Result type alias for asana-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for asana-export
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "throttle.max_concurrent")
        key: Option<String>,
    },

    /// A single API call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Fetching a resource failed
    #[error("failed to {operation}: {source}")]
    Fetch {
        /// What was being fetched (e.g., "fetch tasks for project 1201")
        operation: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// An export stage failed, aborting the export
    #[error("export failed during {stage}: {source}")]
    Export {
        /// The stage that was running when the failure surfaced
        stage: Stage,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Serialization error (rendering the export record)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (writing the export record)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap this error with the resource and operation being fetched
    pub fn fetching(self, operation: impl Into<String>) -> Self {
        Error::Fetch {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// Wrap this error with the stage that was running
    pub fn in_stage(self, stage: Stage) -> Self {
        Error::Export {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost API failure, if this error came from an API call
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            Error::Fetch { source, .. } | Error::Export { source, .. } => source.api_error(),
            _ => None,
        }
    }

    /// The stage recorded on this error, if the orchestrator added one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Export { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns true if the export gave up because the retry budget ran out
    pub fn is_rate_limit_exhausted(&self) -> bool {
        matches!(self.api_error(), Some(ApiError::RetriesExhausted { .. }))
    }
}

/// Failure of a single call against one API path
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered HTTP 429 Too Many Requests
    #[error("rate limited on {path} (retry after {}s)", rate_limit.retry_after)]
    RateLimited {
        /// Request path
        path: String,
        /// Rate-limit headers from the 429 response
        rate_limit: RateLimitState,
    },

    /// The server kept answering 429 after every allowed retry
    #[error("rate limit persisted on {path} after {attempts} attempts")]
    RetriesExhausted {
        /// Request path
        path: String,
        /// Total attempts made, including the first
        attempts: u32,
        /// Rate-limit headers from the last 429 response
        rate_limit: RateLimitState,
    },

    /// Any other non-success status
    #[error("HTTP {status} from {path}: {body}")]
    Status {
        /// Request path
        path: String,
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Transport failure (connect, timeout, TLS, body read)
    #[error("network error on {path}: {source}")]
    Network {
        /// Request path
        path: String,
        /// The underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected schema
    #[error("unexpected response shape from {path}: {source}")]
    Decode {
        /// Request path
        path: String,
        /// The underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// The throttle gate was closed before the request could be sent
    #[error("request not sent: {0}")]
    GateClosed(#[from] GateClosed),
}

impl ApiError {
    /// The API path the failing call was made against
    ///
    /// `None` when the request never left the throttle gate.
    pub fn path(&self) -> Option<&str> {
        match self {
            ApiError::RateLimited { path, .. }
            | ApiError::RetriesExhausted { path, .. }
            | ApiError::Status { path, .. }
            | ApiError::Network { path, .. }
            | ApiError::Decode { path, .. } => Some(path),
            ApiError::GateClosed(_) => None,
        }
    }

    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RateLimited { .. } | ApiError::RetriesExhausted { .. } => Some(429),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network { .. } | ApiError::Decode { .. } | ApiError::GateClosed(_) => None,
        }
    }
}
