//! Data access error types

use thiserror::Error;

/// Unified error taxonomy for the data access layer.
///
/// Callers see the same kinds whether an operation was served by the
/// remote backend or by the local entity store.
#[derive(Debug, Error)]
pub enum DataError {
    /// Remote call could not be completed (network failure or timeout).
    /// Never produced in fallback mode.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Operation target does not exist in the active source.
    #[error("{0} not found")]
    NotFound(String),

    /// Caller-supplied data violates an entity invariant.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Credential rejected by the remote source. Not retried.
    #[error("unauthorized")]
    Unauthorized,

    /// A stream frame could not be decoded. Consumed at the stream
    /// client boundary, never surfaced to façade callers.
    #[error("malformed stream frame: {0}")]
    Malformed(String),
}

impl DataError {
    pub fn unreachable(msg: impl Into<String>) -> Self {
        DataError::Unreachable(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        DataError::NotFound(resource.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DataError::Validation(msg.into())
    }

    /// Whether this failure counts toward the re-probe threshold.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, DataError::Unreachable(_))
    }
}

/// Result type for data access operations
pub type DataResult<T> = Result<T, DataError>;
