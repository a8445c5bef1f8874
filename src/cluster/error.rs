//! Classified Kubernetes API failures.

use thiserror::Error;

use crate::error::ConformanceError;

/// A failed Kubernetes API call, classified by how callers should react.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    /// The requested object does not exist.
    #[error("{operation}: not found: {message}")]
    NotFound {
        /// Operation being attempted.
        operation: String,
        /// API error message.
        message: String,
    },

    /// A failure that may succeed when retried (timeouts, throttling,
    /// dropped connections).
    #[error("{operation}: transient failure: {message}")]
    Transient {
        /// Operation being attempted.
        operation: String,
        /// API or transport error message.
        message: String,
    },

    /// Any other failure; retrying will not help.
    #[error("{operation}: {message}")]
    Rejected {
        /// Operation being attempted.
        operation: String,
        /// API or transport error message.
        message: String,
    },
}

impl ClusterError {
    /// Returns `true` when the call may succeed if repeated.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Returns `true` when the object was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the API or transport message without the operation prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound { message, .. }
            | Self::Transient { message, .. }
            | Self::Rejected { message, .. } => message,
        }
    }

    /// Returns the operation that failed.
    #[must_use]
    pub fn operation(&self) -> &str {
        match self {
            Self::NotFound { operation, .. }
            | Self::Transient { operation, .. }
            | Self::Rejected { operation, .. } => operation,
        }
    }
}

impl From<ClusterError> for ConformanceError {
    fn from(error: ClusterError) -> Self {
        Self::Kubernetes {
            operation: error.operation().to_owned(),
            message: error.message().to_owned(),
        }
    }
}
