//! Error types for the policy.
//!
//! Tick decisions never fail; only configuration loading and name parsing do.

use thiserror::Error;

/// Result type alias using [`PolicyError`].
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Top-level error type for the policy crate.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Configuration file does not exist.
    #[error("Policy config not found: {0}")]
    ConfigNotFound(String),

    /// Configuration file could not be read.
    #[error("Failed to read policy config: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Configuration text is not valid RON.
    #[error("Failed to parse policy config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Configuration parsed but holds unusable values.
    #[error("Invalid policy config: {0}")]
    InvalidConfig(String),

    /// A build-kind name the engine does not know about.
    #[error("Unknown build kind: {0}")]
    UnknownBuildKind(String),
}
