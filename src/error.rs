//! Error types for the fitness scoring coordinator
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for fitscore operations.
///
/// Only `NotFound`, `NoFork`, `Database`, `Config`, `Io`, `Serialization` and
/// `Internal` are permitted to surface as `Err` out of [`crate::coordinator::Coordinator::score`];
/// worker-local failures are captured as a per-dimension outcome instead of an
/// error (spec §7 propagation policy).
#[derive(Error, Debug)]
pub enum FitscoreError {
    /// Résumé or job does not exist in the external store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Fork/Context Manager exhausted all provisioning strategies for a kind.
    #[error("no fork available: {0}")]
    NoFork(String),

    /// A worker produced an invalid (non-finite / out-of-range) score.
    #[error("invalid worker result: {0}")]
    WorkerInvalidResult(String),

    /// Writing a WorkerResult or CompositeScore failed.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] libsql::Error),

    /// Outbound HTTP error (external resume/job store).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unexpected fault in the coordinator itself.
    #[error("internal error: {0}")]
    Internal(String),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FitscoreError>;

/// Convert anyhow::Error to FitscoreError
impl From<anyhow::Error> for FitscoreError {
    fn from(err: anyhow::Error) -> Self {
        FitscoreError::Other(err.to_string())
    }
}
