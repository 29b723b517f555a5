//! Backend configuration, validation states and live destinations

use super::aws::{AwsConfig, AwsDestination};
use super::azure::{AzureConfig, AzureDestination};
use super::local::{LocalConfig, LocalDestination};
use crate::error::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Destination reference used as the key of status and error maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendRef {
    Local,
    Azure,
    Aws,
}

impl BackendRef {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendRef::Local => "local",
            BackendRef::Azure => "azure",
            BackendRef::Aws => "aws",
        }
    }
}

impl std::fmt::Display for BackendRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one backend. There are no transitions once computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendState {
    /// Required configuration is missing; holds the resource name
    Unset(&'static str),
    /// Location could not be reached, written or created
    Unreachable(String),
    /// Location exists but is not directory-like
    NotAContainer(String),
    /// Location exists (or was created) and accepts writes
    Valid,
}

/// Public status entry: `{valid, error}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub valid: bool,
    pub error: Option<String>,
}

impl From<&BackendState> for BackendStatus {
    fn from(state: &BackendState) -> Self {
        match state {
            BackendState::Valid => BackendStatus {
                valid: true,
                error: None,
            },
            BackendState::Unset(resource) => BackendStatus {
                valid: false,
                error: Some(format!("{} not set", resource)),
            },
            BackendState::Unreachable(msg) | BackendState::NotAContainer(msg) => BackendStatus {
                valid: false,
                error: Some(msg.clone()),
            },
        }
    }
}

/// A destination that passed validation and can receive files
pub enum Destination {
    Local(LocalDestination),
    Azure(AzureDestination),
    Aws(AwsDestination),
}

impl Destination {
    pub fn reference(&self) -> BackendRef {
        match self {
            Destination::Local(_) => BackendRef::Local,
            Destination::Azure(_) => BackendRef::Azure,
            Destination::Aws(_) => BackendRef::Aws,
        }
    }

    /// Write `payload` under `file_name`, relative to the validated location
    pub async fn put(&self, file_name: &str, payload: Bytes) -> Result<()> {
        match self {
            Destination::Local(d) => d.put(file_name, payload).await,
            Destination::Azure(d) => d.put(file_name, payload).await,
            Destination::Aws(d) => d.put(file_name, payload).await,
        }
    }
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Destination<{}>", self.reference())
    }
}

/// Validated backend: its state plus, when valid, the live destination
#[derive(Debug)]
pub struct Connection {
    pub reference: BackendRef,
    pub state: BackendState,
    pub destination: Option<Destination>,
}

impl Connection {
    pub(crate) fn invalid(reference: BackendRef, state: BackendState) -> Self {
        Self {
            reference,
            state,
            destination: None,
        }
    }

    pub(crate) fn valid(destination: Destination) -> Self {
        Self {
            reference: destination.reference(),
            state: BackendState::Valid,
            destination: Some(destination),
        }
    }

    pub fn status(&self) -> BackendStatus {
        BackendStatus::from(&self.state)
    }
}

/// Configuration of one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Nothing was supplied for this backend; it is left out of the status map
    Unconfigured(BackendRef),
    Local(LocalConfig),
    Azure(AzureConfig),
    Aws(AwsConfig),
}

impl BackendConfig {
    pub fn reference(&self) -> BackendRef {
        match self {
            BackendConfig::Unconfigured(reference) => *reference,
            BackendConfig::Local(_) => BackendRef::Local,
            BackendConfig::Azure(_) => BackendRef::Azure,
            BackendConfig::Aws(_) => BackendRef::Aws,
        }
    }

    /// Validate the backend and open its destination when it is usable.
    ///
    /// Never fails: every problem ends up in the returned state.
    pub async fn connect(self) -> Connection {
        let reference = self.reference();
        let connection = match self {
            BackendConfig::Unconfigured(reference) => {
                Connection::invalid(reference, BackendState::Unset("backend"))
            },
            BackendConfig::Local(config) => config.connect().await,
            BackendConfig::Azure(config) => config.connect().await,
            BackendConfig::Aws(config) => config.connect().await,
        };

        match connection.state {
            BackendState::Valid => info!(backend = %reference, "Storage backend ready"),
            ref state => warn!(backend = %reference, ?state, "Storage backend unavailable"),
        }

        connection
    }

    /// Validate only, discarding the destination
    pub async fn validate(self) -> BackendStatus {
        self.connect().await.status()
    }
}
