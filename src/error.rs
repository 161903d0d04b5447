//! Error types for assetgraph.
//!
//! Per-file extraction failures have their own type in
//! [`crate::parser::ExtractError`]; they never abort a batch and so never
//! surface here.

use thiserror::Error;

/// Main error type for assetgraph operations.
#[derive(Debug, Error)]
pub enum AssetGraphError {
    /// IO error outside of per-file extraction (directory walk, config read).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bounded worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// Directory traversal failed during full-scan discovery.
    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A string that is not a well-formed asset identifier.
    #[error("invalid guid: {0:?}")]
    InvalidGuid(String),
}

impl AssetGraphError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        AssetGraphError::Config(msg.into())
    }
}

/// Result type alias for assetgraph operations.
pub type Result<T> = std::result::Result<T, AssetGraphError>;
