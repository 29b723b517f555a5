//! Run configuration
//!
//! Loaded from a `.env` file (when present) and the process environment.

use crate::error::{EtlError, Result};
use crate::extractor::ExtractorConfig;
use crate::storage::{StorageOptions, DEFAULT_AWS_REGION};
use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use std::str::FromStr;

/// Default position of the package link among the `DLTINS` entries
pub const DEFAULT_DOWNLOAD_LINK_INDEX: usize = 1;

/// Output file name for a run on `date`: `firds_<YYYYMMDD>.csv`
pub fn default_output_file_name(date: NaiveDate) -> String {
    format!("firds_{}.csv", date.format("%Y%m%d"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtlConfig {
    /// FIRDS index query URL
    pub source_xml_url: String,
    /// Zero-based position of the package among the `DLTINS` entries
    pub download_link_index: usize,
    pub max_instrument_groups: Option<usize>,
    pub output_file_name: String,
    pub storage: StorageOptions,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            source_xml_url: String::new(),
            download_link_index: DEFAULT_DOWNLOAD_LINK_INDEX,
            max_instrument_groups: None,
            output_file_name: default_output_file_name(Utc::now().date_naive()),
            storage: StorageOptions::default(),
        }
    }
}

impl EtlConfig {
    /// Load `.env` from the working directory, then read the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from environment variables
    ///
    /// - `SOURCE_XML_URL`: index query URL
    /// - `DOWNLOAD_LINK_INDEX`: package position (default 1)
    /// - `MAX_INSTRUMENT_GROUPS`: cap on parsed instrument groups
    /// - `OUTPUT_FILE_NAME`: CSV name (default `firds_<YYYYMMDD>.csv`)
    /// - `STORAGE_LOCAL_DIR`
    /// - `AZURE_CONN_STRING_FILE`, `AZURE_CONTAINER`
    /// - `AWS_SECRET_FILE`, `AWS_KEY`, `AWS_BUCKET`, `AWS_REGION`, `AWS_ENDPOINT`
    ///
    /// Empty variables count as unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            source_xml_url: var("SOURCE_XML_URL").unwrap_or_default(),
            download_link_index: parsed_var("DOWNLOAD_LINK_INDEX")?
                .unwrap_or(defaults.download_link_index),
            max_instrument_groups: parsed_var("MAX_INSTRUMENT_GROUPS")?,
            output_file_name: var("OUTPUT_FILE_NAME").unwrap_or(defaults.output_file_name),
            storage: StorageOptions {
                local_dir: var("STORAGE_LOCAL_DIR").map(PathBuf::from),
                azure_conn_string_file: var("AZURE_CONN_STRING_FILE").map(PathBuf::from),
                azure_container: var("AZURE_CONTAINER"),
                aws_secret_file: var("AWS_SECRET_FILE").map(PathBuf::from),
                aws_key: var("AWS_KEY"),
                aws_bucket: var("AWS_BUCKET"),
                aws_region: var("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
                aws_endpoint: var("AWS_ENDPOINT"),
            },
        })
    }

    /// Check the settings a pipeline run depends on
    pub fn validate(&self) -> Result<()> {
        if self.source_xml_url.trim().is_empty() {
            return Err(EtlError::config("SOURCE_XML_URL must be set"));
        }

        if !self.source_xml_url.starts_with("http://") && !self.source_xml_url.starts_with("https://")
        {
            return Err(EtlError::config(format!(
                "SOURCE_XML_URL must be an http(s) URL, got {}",
                self.source_xml_url
            )));
        }

        if self.output_file_name.trim().is_empty() {
            return Err(EtlError::config("OUTPUT_FILE_NAME cannot be empty"));
        }

        if self.max_instrument_groups == Some(0) {
            return Err(EtlError::config("MAX_INSTRUMENT_GROUPS must be greater than 0"));
        }

        Ok(())
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            max_instrument_groups: self.max_instrument_groups,
            ..Default::default()
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|e| EtlError::config(format!("invalid {} '{}': {}", name, v, e)))
        })
        .transpose()
}
