//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for FIRDS operations
pub type Result<T> = std::result::Result<T, FirdsError>;

/// Error categories shared by every FIRDS crate
#[derive(Error, Debug)]
pub enum FirdsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FirdsError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        FirdsError::Config(msg.into())
    }
}
