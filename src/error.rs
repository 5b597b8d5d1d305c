//! Error types for the Attune behavior engine
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.
//!
//! The propagation policy for this subsystem is deliberately narrow: nothing
//! crosses the engine's public API boundary as an error. Internal components
//! return `Result` and the engine converts failures into degraded-but-valid
//! results, so the variants below describe *why* a degradation happened, not
//! what the caller must handle.

use thiserror::Error;

/// Main error type for Attune engine operations
#[derive(Error, Debug)]
pub enum AttuneError {
    /// Durable store operation failed (network, I/O, contention)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Durable store schema/table not provisioned yet.
    ///
    /// Non-fatal by contract: callers degrade to local-only operation
    /// instead of retrying.
    #[error("Persistence schema missing: {0}")]
    SchemaMissing(String),

    /// Suggestion provider call failed or returned malformed data
    #[error("Suggestion provider error: {0}")]
    Provider(String),

    /// Input failed validation (out-of-range rating, empty kind, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl AttuneError {
    /// Whether this failure means "feature unavailable, continue local-only"
    /// rather than "something went wrong worth surfacing".
    pub fn is_degraded_mode(&self) -> bool {
        matches!(self, AttuneError::SchemaMissing(_))
    }
}

/// Result type alias for Attune engine operations
pub type Result<T> = std::result::Result<T, AttuneError>;

/// Convert anyhow::Error to AttuneError
impl From<anyhow::Error> for AttuneError {
    fn from(err: anyhow::Error) -> Self {
        AttuneError::Other(err.to_string())
    }
}
