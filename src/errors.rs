/*!
 * Error types for the babelflow pipeline.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

use crate::app_config::BackendKind;

/// Failure category reported by a translation backend.
///
/// The category informs logging and caller-facing diagnostics; the
/// orchestrator's recovery ladder (fallback backend, then bounded retry
/// queue) applies to every category except credential problems, which are
/// configuration errors and never re-dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connectivity problem: DNS, connect, timeout
    Network,
    /// Authentication rejected by the backend
    Auth,
    /// API key malformed or revoked
    InvalidKey,
    /// Account quota exhausted
    Quota,
    /// Backend throttled the request
    RateLimit,
    /// Backend-side fault (5xx)
    Server,
    /// Anything the adapter could not classify
    Unknown,
}

impl ErrorCategory {
    /// Map an HTTP status code to a category
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Auth,
            403 => Self::InvalidKey,
            402 | 413 => Self::Quota,
            429 => Self::RateLimit,
            s if s >= 500 => Self::Server,
            _ => Self::Unknown,
        }
    }

    /// Whether a failure of this category is worth re-dispatching
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Auth | Self::InvalidKey)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Network => "NETWORK",
            Self::Auth => "AUTH",
            Self::InvalidKey => "INVALID_KEY",
            Self::Quota => "QUOTA",
            Self::RateLimit => "RATE_LIMIT",
            Self::Server => "SERVER",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// Error returned by a translation backend adapter
#[derive(Error, Debug, Clone)]
#[error("{backend} backend error [{category}]{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
pub struct BackendError {
    /// HTTP status code, when the failure came from an HTTP response
    pub status: Option<u16>,
    /// Human-readable description of the failure
    pub message: String,
    /// Backend that produced the failure
    pub backend: BackendKind,
    /// Failure classification
    pub category: ErrorCategory,
}

impl BackendError {
    /// Build an error from an HTTP status code and response body
    pub fn from_response(backend: BackendKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            backend,
            category: ErrorCategory::from_status(status),
        }
    }

    /// Build a connectivity error (no HTTP response was received)
    pub fn network(backend: BackendKind, message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            backend,
            category: ErrorCategory::Network,
        }
    }

    /// Build an error for a malformed or incomplete backend response
    pub fn invalid_response(backend: BackendKind, message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            backend,
            category: ErrorCategory::Unknown,
        }
    }

    /// Whether the orchestrator may re-dispatch after this failure
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

/// Errors that can occur during pipeline orchestration
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from a backend adapter
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration rejected at validation time
    #[error("Configuration error: {0}")]
    Config(String),

    /// A text unit could not be fully translated after all retries
    #[error("Unit '{unit}' failed: {failed} of {total} chunks could not be translated")]
    UnitFailed {
        /// Caller-assigned unit identity
        unit: String,
        /// Number of chunks without a translation
        failed: usize,
        /// Total number of chunks in the unit
        total: usize,
    },

    /// The pipeline was shut down while work was pending
    #[error("Pipeline is shut down")]
    Inactive,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a backend adapter
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error from pipeline orchestration
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}
