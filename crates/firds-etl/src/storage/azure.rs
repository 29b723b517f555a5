//! Azure Blob Storage backend
//!
//! The container must already exist: it is never created. A container that a
//! root listing cannot see is reported as `container not in storage`.

use super::backend::{BackendRef, BackendState, Connection, Destination};
use crate::error::{EtlError, Result};
use crate::secret::{read_secret, AzureConnectionString, SecretKind};
use bytes::Bytes;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AzureConfig {
    /// File holding the connection string (mode 0600)
    pub conn_string_file: Option<PathBuf>,
    pub container: Option<String>,
}

impl AzureConfig {
    pub fn new(conn_string_file: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            conn_string_file: Some(conn_string_file.into()),
            container: Some(container.into()),
        }
    }

    pub async fn connect(self) -> Connection {
        let Some(conn_string_file) = self.conn_string_file else {
            return unset("connection string");
        };
        let Some(container) = self.container.filter(|c| !c.is_empty()) else {
            return unset("container");
        };

        if container.contains('/') {
            return Connection::invalid(
                BackendRef::Azure,
                BackendState::NotAContainer(format!("Expected to be a Container: {}", container)),
            );
        }

        let store = match read_secret(&conn_string_file, SecretKind::Azure)
            .and_then(|secret| AzureConnectionString::parse(&secret))
            .and_then(|conn| build_store(&conn, &container))
        {
            Ok(store) => store,
            Err(e) => {
                return Connection::invalid(BackendRef::Azure, BackendState::Unreachable(e.to_string()))
            },
        };

        match store.list_with_delimiter(None).await {
            Ok(listing) => {
                debug!(
                    %container,
                    prefixes = listing.common_prefixes.len(),
                    objects = listing.objects.len(),
                    "Container listed"
                );
                Connection::valid(Destination::Azure(AzureDestination { store, container }))
            },
            Err(e) if is_missing_container(&e) => Connection::invalid(
                BackendRef::Azure,
                BackendState::Unreachable("container not in storage".to_string()),
            ),
            Err(e) => Connection::invalid(
                BackendRef::Azure,
                BackendState::Unreachable(format!("could not list container: {}", e)),
            ),
        }
    }
}

fn unset(resource: &'static str) -> Connection {
    Connection::invalid(BackendRef::Azure, BackendState::Unset(resource))
}

fn build_store(conn: &AzureConnectionString, container: &str) -> Result<Arc<dyn ObjectStore>> {
    let account = conn
        .account_name()
        .ok_or_else(|| EtlError::Validation("connection string lacks AccountName".to_string()))?;
    let key = conn
        .account_key()
        .ok_or_else(|| EtlError::Validation("connection string lacks AccountKey".to_string()))?;

    let mut builder = MicrosoftAzureBuilder::new()
        .with_account(account)
        .with_access_key(key)
        .with_container_name(container);

    if let Some(endpoint) = conn.blob_endpoint() {
        builder = builder
            .with_endpoint(endpoint.to_string())
            .with_allow_http(endpoint.starts_with("http://"));
    }

    let store = builder
        .build()
        .map_err(|e| EtlError::Storage(format!("could not configure Azure client: {}", e)))?;
    Ok(Arc::new(store))
}

fn is_missing_container(err: &object_store::Error) -> bool {
    if matches!(err, object_store::Error::NotFound { .. }) {
        return true;
    }
    let msg = err.to_string();
    msg.contains("ContainerNotFound") || msg.contains("404")
}

/// Validated Azure container
pub struct AzureDestination {
    store: Arc<dyn ObjectStore>,
    container: String,
}

impl AzureDestination {
    pub fn container(&self) -> &str {
        &self.container
    }

    pub async fn put(&self, file_name: &str, payload: Bytes) -> Result<()> {
        let path = ObjectPath::from(file_name);
        let size = payload.len();

        self.store
            .put(&path, PutPayload::from(payload))
            .await
            .map_err(|e| EtlError::Storage(format!("could not upload {}: {}", path, e)))?;

        debug!(container = %self.container, %path, bytes = size, "Uploaded blob");
        Ok(())
    }
}

impl std::fmt::Debug for AzureDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AzureDestination<{}>", self.container)
    }
}
