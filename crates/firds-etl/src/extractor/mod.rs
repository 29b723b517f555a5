//! FIRDS extraction: index resolution and package parsing
//!
//! 1. [`Extractor::fetch_package_url`] downloads the index and picks the
//!    N-th `DLTINS` download link.
//! 2. [`Extractor::parse_package_content`] downloads that ZIP package and
//!    parses the instruments of the XML file it contains.
//!
//! Both requests distinguish a request that never got a response
//! ([`EtlError::Network`]) from a non-2xx answer ([`EtlError::HttpStatus`]).

pub mod index;
pub mod instruments;

use crate::error::{EtlError, Result};
use crate::record::InstrumentTable;
use bytes::Bytes;
use std::io::{BufReader, Cursor};
use tracing::{debug, info, instrument, warn};

pub use index::{parse_index_xml, resolve_link, IndexDocument};
pub use instruments::{parse_instruments_xml, ParsedInstruments};

/// `file_type` of the instrument reference-data delta packages
pub const INSTRUMENT_FILE_TYPE: &str = "DLTINS";

/// Extractor settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Index entries are filtered on this `file_type`
    pub file_type: String,
    /// Stop after this many instrument-list groups (`None` parses everything).
    ///
    /// Any limit drops the instruments of the remaining groups; a warning is
    /// logged whenever that happens.
    pub max_instrument_groups: Option<usize>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            file_type: INSTRUMENT_FILE_TYPE.to_string(),
            max_instrument_groups: None,
        }
    }
}

impl ExtractorConfig {
    pub fn with_max_instrument_groups(mut self, max: usize) -> Self {
        self.max_instrument_groups = Some(max);
        self
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }
}

/// Fetches and parses FIRDS publications
#[derive(Debug, Clone)]
pub struct Extractor {
    client: reqwest::Client,
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Use a preconfigured client (timeouts, proxies)
    pub fn with_client(client: reqwest::Client, config: ExtractorConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Resolve the download link of the `link_index`-th (zero-based) package
    /// of the configured type.
    ///
    /// Returns `Ok(None)` when the index lists fewer matching packages; that is
    /// a "nothing to do" outcome, not an error.
    #[instrument(skip(self))]
    pub async fn fetch_package_url(
        &self,
        index_url: &str,
        link_index: usize,
    ) -> Result<Option<String>> {
        let body = self.fetch(index_url).await?;
        let docs = parse_index_xml(&body)?;

        let url = resolve_link(&docs, &self.config.file_type, link_index).map(str::to_string);

        match url {
            Some(ref url) => info!(%url, "Resolved package URL"),
            None => warn!(
                documents = docs.len(),
                file_type = %self.config.file_type,
                "Index has no matching package at this position"
            ),
        }

        Ok(url)
    }

    /// Download a ZIP package and parse the instruments of its first file
    #[instrument(skip(self))]
    pub async fn parse_package_content(&self, package_url: &str) -> Result<InstrumentTable> {
        let body = self.fetch(package_url).await?;
        let table = self.parse_package_bytes(&body)?;

        info!(records = table.len(), "Package parsed");
        Ok(table)
    }

    /// Parse an already downloaded ZIP package
    pub fn parse_package_bytes(&self, archive: &[u8]) -> Result<InstrumentTable> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(archive)).map_err(EtlError::archive)?;

        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(EtlError::archive)?;
            if entry.is_dir() {
                continue;
            }

            let name = entry.name().to_string();
            debug!(entry = %name, size = entry.size(), "Parsing package entry");

            let parsed = parse_instruments_xml(
                BufReader::new(entry),
                self.config.max_instrument_groups,
            )?;

            if parsed.truncated {
                warn!(
                    entry = %name,
                    groups = parsed.groups,
                    records = parsed.records.len(),
                    "Instrument group limit reached, remaining groups were not parsed"
                );
            }

            return Ok(InstrumentTable::new(parsed.records));
        }

        Err(EtlError::Archive("package contains no file entries".to_string()))
    }

    async fn fetch(&self, url: &str) -> Result<Bytes> {
        debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| EtlError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| EtlError::Network {
            url: url.to_string(),
            source,
        })?;

        debug!(%url, bytes = body.len(), "Downloaded");
        Ok(body)
    }
}
