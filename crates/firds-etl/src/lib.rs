//! FIRDS ETL Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Downloads the ESMA FIRDS reference-data index, resolves the instrument
//! package (`DLTINS`) it links to, parses the instruments out of the zipped XML
//! payload, derives a couple of columns and writes the result as CSV to every
//! configured storage backend.
//!
//! # Pipeline
//!
//! - [`extractor`]: index resolution and package parsing
//! - [`transformer`]: derived columns
//! - [`storage`]: local / Azure Blob / AWS S3 destinations with per-backend status
//! - [`pipeline`]: the end-to-end run used by the binary
//!
//! # Example
//!
//! ```no_run
//! use firds_etl::extractor::{Extractor, ExtractorConfig};
//! use firds_etl::storage::{Storage, StorageOptions};
//! use firds_etl::transformer::create_derived_columns;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let extractor = Extractor::new(ExtractorConfig::default());
//!     let Some(url) = extractor
//!         .fetch_package_url("https://registers.esma.europa.eu/solr/...", 1)
//!         .await?
//!     else {
//!         return Ok(());
//!     };
//!
//!     let mut table = extractor.parse_package_content(&url).await?;
//!     create_derived_columns(&mut table);
//!
//!     let storage = Storage::new(StorageOptions::default().with_local_dir("./data")).await;
//!     let failures = storage.store_csv(&table, "firds.csv").await?;
//!     assert!(failures.is_empty());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod record;
pub mod secret;
pub mod storage;
pub mod transformer;

pub use error::{EtlError, Result};
pub use record::{InstrumentField, InstrumentTable, Record};

use clap::{Args, Parser, Subcommand};
use firds_common::logging::{LogConfig, LogLevel, LogOutput};
use std::path::PathBuf;

/// FIRDS reference-data ETL
#[derive(Parser, Debug)]
#[command(name = "firds-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read settings from this file instead of `./.env`
    #[arg(long, env = "FIRDS_ENV_FILE", global = true)]
    pub env_file: Option<PathBuf>,
}

impl Cli {
    /// Console logging at info, or debug with `--verbose`
    pub fn default_log_config(&self) -> LogConfig {
        LogConfig::builder()
            .level(self.log_level())
            .output(LogOutput::Console)
            .log_file_prefix("firds-etl")
            .filter_directives("aws_smithy_runtime=warn,aws_config=warn,hyper=warn")
            .build()
    }

    /// Defaults, then the `LOG_*` environment, then `--verbose`
    pub fn log_config(&self) -> firds_common::Result<LogConfig> {
        let mut config = self.default_log_config().merge_env()?;
        if self.verbose {
            config.level = LogLevel::Debug;
        }
        Ok(config)
    }

    fn log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve, extract, derive and store the instrument package
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        storage: StorageArgs,

        /// Output CSV file name
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print the resolved package link
    Resolve {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Validate the storage backends and print their status
    Status {
        #[command(flatten)]
        storage: StorageArgs,
    },
}

/// Overrides for the index settings
#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Index query URL
    #[arg(long)]
    pub source_url: Option<String>,

    /// Zero-based position of the package among the DLTINS entries
    #[arg(long)]
    pub link_index: Option<usize>,

    /// Stop parsing after this many instrument groups
    #[arg(long)]
    pub max_groups: Option<usize>,
}

impl SourceArgs {
    pub fn apply(&self, config: &mut config::EtlConfig) {
        if let Some(url) = &self.source_url {
            config.source_xml_url = url.clone();
        }
        if let Some(index) = self.link_index {
            config.download_link_index = index;
        }
        if let Some(max) = self.max_groups {
            config.max_instrument_groups = Some(max);
        }
    }
}

/// Overrides for the storage settings
#[derive(Args, Debug, Default)]
pub struct StorageArgs {
    /// Local output directory
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// Azure container
    #[arg(long)]
    pub azure_container: Option<String>,

    /// S3 bucket
    #[arg(long)]
    pub aws_bucket: Option<String>,
}

impl StorageArgs {
    pub fn apply(&self, config: &mut config::EtlConfig) {
        if let Some(dir) = &self.local_dir {
            config.storage.local_dir = Some(dir.clone());
        }
        if let Some(container) = &self.azure_container {
            config.storage.azure_container = Some(container.clone());
        }
        if let Some(bucket) = &self.aws_bucket {
            config.storage.aws_bucket = Some(bucket.clone());
        }
    }
}
