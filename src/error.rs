//! Error types surfaced by conformance steps and their collaborators.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while preparing fixtures, talking to the cluster, probing
/// the Ingress, or asserting on the captured response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConformanceError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// A fixture file does not exist in the active file source.
    #[error("test file {path:?} was not found.\n{description}")]
    FixtureNotFound {
        /// Path that was requested.
        path: String,
        /// Description of where the file source looks for files.
        description: String,
    },

    /// A fixture file exists but could not be decoded.
    #[error("invalid fixture {path}: {message}")]
    Fixture {
        /// Path of the offending fixture.
        path: String,
        /// Decoder error detail.
        message: String,
    },

    /// A step ran before the state it depends on was recorded.
    #[error("scenario has no {what} associated")]
    MissingState {
        /// The missing piece of scenario state.
        what: String,
    },

    /// The Kubernetes API rejected or failed an operation.
    #[error("kubernetes {operation} failed: {message}")]
    Kubernetes {
        /// Operation being attempted, such as `create namespace`.
        operation: String,
        /// Error returned by the API client.
        message: String,
    },

    /// A polling loop gave up before its condition held.
    #[error("timed out after {waited:?} waiting for {condition}")]
    Timeout {
        /// Condition that never became true.
        condition: String,
        /// Time spent polling.
        waited: Duration,
    },

    /// The HTTP request could not be built.
    #[error("invalid HTTP request: {message}")]
    InvalidRequest {
        /// Detail about the rejected method, header, or URL.
        message: String,
    },

    /// The HTTP request failed at the transport level.
    #[error("HTTP request to {url} failed: {message}")]
    Transport {
        /// Target URL.
        url: String,
        /// Transport error detail.
        message: String,
    },

    /// A response assertion did not hold.
    #[error("{message}")]
    Assertion {
        /// Mismatch description naming expected and actual values.
        message: String,
    },

    /// Local I/O failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}

impl ConformanceError {
    /// Builds an assertion failure from a message.
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    /// Builds a Kubernetes failure for `operation` from any displayable error.
    #[must_use]
    pub fn kubernetes(operation: &str, error: &impl std::fmt::Display) -> Self {
        Self::Kubernetes {
            operation: operation.to_owned(),
            message: error.to_string(),
        }
    }

    /// Builds a missing-state failure.
    #[must_use]
    pub fn missing(what: &str) -> Self {
        Self::MissingState {
            what: what.to_owned(),
        }
    }
}
