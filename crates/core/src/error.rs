//! Error types for Orbinest.
//!
//! Geometric degeneracy is not an error here: an NFP that cannot be traced is
//! reported as `None` by the kernel and only costs fitness. These variants cover
//! malformed input, configuration problems and failed work batches.

use thiserror::Error;

/// Result type alias for Orbinest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing or running a nest.
#[derive(Debug, Error)]
pub enum Error {
    /// A part polygon is unusable (too few points, zero area after cleaning).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The bin polygon is unusable.
    #[error("Invalid bin: {0}")]
    InvalidBoundary(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// NFP computation failed in a way that is not plain degeneracy.
    #[error("NFP computation failed: {0}")]
    NfpError(String),

    /// Nothing could be placed for an individual.
    #[error("No valid placement found: {0}")]
    NoPlacement(String),

    /// A work item inside a parallel batch failed; the whole batch is rejected.
    #[error("Worker failure: {0}")]
    Worker(String),

    /// Computation cancelled.
    #[error("Computation cancelled")]
    Cancelled,

    /// Serialization error.
    #[cfg(feature = "serde")]
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
