//! CSV storage across local, Azure Blob and AWS S3 destinations
//!
//! Every backend is validated once, when [`Storage`] is built. The resulting
//! status map is a snapshot: it is never refreshed, and
//! [`Storage::store_csv`] only writes to the backends that were valid then.

pub mod aws;
pub mod azure;
pub mod backend;
pub mod local;

use crate::error::Result;
use crate::record::InstrumentTable;
use bytes::Bytes;
use firds_common::checksum::sha256_hex;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

pub use aws::{AwsConfig, AwsDestination, DEFAULT_AWS_REGION};
pub use azure::{AzureConfig, AzureDestination};
pub use backend::{BackendConfig, BackendRef, BackendState, BackendStatus, Connection, Destination};
pub use local::{LocalConfig, LocalDestination};

/// Backend reference → validation status
pub type StatusMap = BTreeMap<BackendRef, BackendStatus>;

/// Backend reference → write error, for the backends whose write failed
pub type StoreReport = BTreeMap<BackendRef, String>;

/// Raw storage parameters, any subset of which may be supplied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
    pub local_dir: Option<PathBuf>,
    pub azure_conn_string_file: Option<PathBuf>,
    pub azure_container: Option<String>,
    pub aws_secret_file: Option<PathBuf>,
    pub aws_key: Option<String>,
    pub aws_bucket: Option<String>,
    pub aws_region: String,
    pub aws_endpoint: Option<String>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            local_dir: None,
            azure_conn_string_file: None,
            azure_container: None,
            aws_secret_file: None,
            aws_key: None,
            aws_bucket: None,
            aws_region: DEFAULT_AWS_REGION.to_string(),
            aws_endpoint: None,
        }
    }
}

impl StorageOptions {
    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }

    pub fn with_azure(
        mut self,
        conn_string_file: impl Into<PathBuf>,
        container: impl Into<String>,
    ) -> Self {
        self.azure_conn_string_file = Some(conn_string_file.into());
        self.azure_container = Some(container.into());
        self
    }

    pub fn with_aws(
        mut self,
        secret_file: impl Into<PathBuf>,
        key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        self.aws_secret_file = Some(secret_file.into());
        self.aws_key = Some(key.into());
        self.aws_bucket = Some(bucket.into());
        self
    }

    pub fn with_aws_region(mut self, region: impl Into<String>) -> Self {
        self.aws_region = region.into();
        self
    }

    pub fn with_aws_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.aws_endpoint = Some(endpoint.into());
        self
    }

    /// One configuration per backend.
    ///
    /// The local backend is always reported. Azure and AWS are
    /// [`BackendConfig::Unconfigured`] unless at least one of their
    /// parameters is supplied.
    pub fn backend_configs(&self) -> Vec<BackendConfig> {
        let local = BackendConfig::Local(LocalConfig {
            dir: self.local_dir.clone(),
        });

        let azure = if self.azure_conn_string_file.is_some() || self.azure_container.is_some() {
            BackendConfig::Azure(AzureConfig {
                conn_string_file: self.azure_conn_string_file.clone(),
                container: self.azure_container.clone(),
            })
        } else {
            BackendConfig::Unconfigured(BackendRef::Azure)
        };

        let aws = if self.aws_secret_file.is_some()
            || self.aws_key.is_some()
            || self.aws_bucket.is_some()
        {
            BackendConfig::Aws(AwsConfig {
                secret_file: self.aws_secret_file.clone(),
                key: self.aws_key.clone(),
                bucket: self.aws_bucket.clone(),
                region: self.aws_region.clone(),
                endpoint: self.aws_endpoint.clone(),
            })
        } else {
            BackendConfig::Unconfigured(BackendRef::Aws)
        };

        vec![local, azure, aws]
    }
}

/// Validated set of storage backends
#[derive(Debug)]
pub struct Storage {
    status: StatusMap,
    destinations: Vec<Destination>,
}

impl Storage {
    /// Validate every configured backend. Never fails: problems are recorded
    /// in [`Storage::status`].
    pub async fn new(options: StorageOptions) -> Self {
        Self::from_configs(options.backend_configs()).await
    }

    #[instrument(skip_all)]
    pub async fn from_configs(configs: Vec<BackendConfig>) -> Self {
        let configured: Vec<_> = configs
            .into_iter()
            .filter(|c| !matches!(c, BackendConfig::Unconfigured(_)))
            .collect();

        let connections = join_all(configured.into_iter().map(BackendConfig::connect)).await;

        let mut status = StatusMap::new();
        let mut destinations = Vec::new();
        for connection in connections {
            status.insert(connection.reference, connection.status());
            if let Some(destination) = connection.destination {
                destinations.push(destination);
            }
        }

        info!(
            configured = status.len(),
            valid = destinations.len(),
            "Storage backends validated"
        );

        Self {
            status,
            destinations,
        }
    }

    pub fn status(&self) -> &StatusMap {
        &self.status
    }

    pub fn valid_backends(&self) -> Vec<BackendRef> {
        self.destinations.iter().map(Destination::reference).collect()
    }

    pub fn has_valid_backend(&self) -> bool {
        !self.destinations.is_empty()
    }

    /// Serialize `table` to CSV and write it as `file_name` to every valid
    /// backend.
    ///
    /// Only write-time failures are reported; invalid backends are skipped
    /// and never appear in the report. Nothing is rolled back when a write
    /// fails.
    #[instrument(skip(self, table), fields(records = table.len()))]
    pub async fn store_csv(&self, table: &InstrumentTable, file_name: &str) -> Result<StoreReport> {
        if self.destinations.is_empty() {
            warn!("No valid storage backend, nothing written");
            return Ok(StoreReport::new());
        }

        let payload = Bytes::from(table.to_csv_bytes()?);
        let checksum = sha256_hex(&payload);
        debug!(bytes = payload.len(), %checksum, "CSV serialized");

        let writes = self.destinations.iter().map(|destination| {
            let payload = payload.clone();
            async move { (destination.reference(), destination.put(file_name, payload).await) }
        });

        let mut report = StoreReport::new();
        for (reference, outcome) in join_all(writes).await {
            match outcome {
                Ok(()) => info!(
                    backend = %reference,
                    file = %file_name,
                    bytes = payload.len(),
                    sha256 = %checksum,
                    "CSV stored"
                ),
                Err(e) => {
                    warn!(backend = %reference, file = %file_name, error = %e, "CSV write failed");
                    report.insert(reference, e.to_string());
                },
            }
        }

        Ok(report)
    }
}
