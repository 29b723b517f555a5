//! FIRDS Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging setup and checksum helpers for the FIRDS ETL
//! workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`FirdsError`] and the [`Result`] alias
//! - **Logging**: subscriber configuration and initialization
//! - **Checksums**: SHA-256 digests of payloads written to storage
//!
//! # Example
//!
//! ```no_run
//! use firds_common::checksum::sha256_hex;
//! use firds_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!(digest = %sha256_hex(b"Id,FullNm\n"), "payload ready");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{FirdsError, Result};
