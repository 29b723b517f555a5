//! Error types for the ETL pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Errors raised by the extractor, secret reader and CSV codec.
///
/// Storage backends never surface these during validation: construction-time
/// failures become status entries and write-time failures are reported per
/// backend.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Missing secret file or local resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Secret file too permissive, or location not writable
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Malformed secret content or wrong resource type
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request never produced a response (DNS, connect, TLS, body read)
    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    pub fn config(msg: impl Into<String>) -> Self {
        EtlError::Config(msg.into())
    }

    pub fn parse(msg: impl std::fmt::Display) -> Self {
        EtlError::Parse(msg.to_string())
    }

    pub fn archive(msg: impl std::fmt::Display) -> Self {
        EtlError::Archive(msg.to_string())
    }
}
