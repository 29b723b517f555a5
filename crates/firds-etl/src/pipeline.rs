//! End-to-end run: resolve, extract, derive, store

use crate::config::EtlConfig;
use crate::error::Result;
use crate::extractor::Extractor;
use crate::storage::{StatusMap, Storage, StoreReport};
use crate::transformer::create_derived_columns;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// What a pipeline run did
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    /// Resolved package link; `None` when the index had no package at the
    /// configured position or nothing could be stored
    pub package_url: Option<String>,
    pub records: usize,
    pub output_file_name: String,
    pub status: StatusMap,
    /// Backends whose write failed
    pub write_errors: StoreReport,
}

impl PipelineOutcome {
    /// At least one backend was valid and every write succeeded
    pub fn is_success(&self) -> bool {
        self.status.values().any(|s| s.valid) && self.write_errors.is_empty()
    }
}

/// Resolve the package link only
#[instrument(skip(config))]
pub async fn resolve(config: &EtlConfig) -> Result<Option<String>> {
    config.validate()?;
    Extractor::new(config.extractor_config())
        .fetch_package_url(&config.source_xml_url, config.download_link_index)
        .await
}

/// Run the whole pipeline.
///
/// Storage is validated first; with no valid backend nothing is downloaded.
/// Fetch and parse failures propagate, write failures end up in
/// [`PipelineOutcome::write_errors`].
#[instrument(skip(config), fields(source = %config.source_xml_url))]
pub async fn run(config: &EtlConfig) -> Result<PipelineOutcome> {
    config.validate()?;
    let started = Instant::now();

    let storage = Storage::new(config.storage.clone()).await;
    let mut outcome = PipelineOutcome {
        package_url: None,
        records: 0,
        output_file_name: config.output_file_name.clone(),
        status: storage.status().clone(),
        write_errors: StoreReport::new(),
    };

    if !storage.has_valid_backend() {
        warn!("No valid storage backend, skipping extraction");
        return Ok(outcome);
    }

    let extractor = Extractor::new(config.extractor_config());
    let Some(package_url) = extractor
        .fetch_package_url(&config.source_xml_url, config.download_link_index)
        .await?
    else {
        info!("No package to process");
        return Ok(outcome);
    };

    let mut table = extractor.parse_package_content(&package_url).await?;
    create_derived_columns(&mut table);

    outcome.write_errors = storage
        .store_csv(&table, &config.output_file_name)
        .await?;
    outcome.records = table.len();
    outcome.package_url = Some(package_url);

    info!(
        records = outcome.records,
        backends = ?storage.valid_backends(),
        failed = outcome.write_errors.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Pipeline finished"
    );

    Ok(outcome)
}
