//! Local directory backend

use super::backend::{BackendRef, BackendState, Connection, Destination};
use crate::error::{EtlError, Result};
use bytes::Bytes;
use firds_common::checksum::{file_sha256_hex, sha256_hex};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Marker created and removed to prove the directory accepts writes
const WRITE_PROBE_NAME: &str = ".firds-write-probe";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalConfig {
    pub dir: Option<PathBuf>,
}

impl LocalConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// - unset path → `directory not set`
    /// - missing path → created recursively
    /// - existing non-directory → `not a directory`
    /// - existing directory → write probe, `could not write in directory` on failure
    /// - path not accessible → `could not write in directory`
    pub async fn connect(self) -> Connection {
        let Some(dir) = self.dir.filter(|d| !d.as_os_str().is_empty()) else {
            return Connection::invalid(BackendRef::Local, BackendState::Unset("directory"));
        };

        match validate_dir(&dir).await {
            BackendState::Valid => Connection::valid(Destination::Local(LocalDestination { dir })),
            state => Connection::invalid(BackendRef::Local, state),
        }
    }
}

async fn validate_dir(dir: &Path) -> BackendState {
    match tokio::fs::metadata(dir).await {
        Err(e) if e.kind() == ErrorKind::NotFound => match tokio::fs::create_dir_all(dir).await {
            Ok(()) => {
                info!(dir = %dir.display(), "Created storage directory");
                BackendState::Valid
            },
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Directory creation failed");
                BackendState::Unreachable(if e.kind() == ErrorKind::PermissionDenied {
                    "could not write in directory".to_string()
                } else {
                    format!("could not create directory: {}", e)
                })
            },
        },
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            debug!(dir = %dir.display(), error = %e, "Directory metadata denied");
            BackendState::Unreachable("could not write in directory".to_string())
        },
        Err(e) => BackendState::Unreachable(format!("could not access directory: {}", e)),
        Ok(meta) if !meta.is_dir() => BackendState::NotAContainer("not a directory".to_string()),
        Ok(_) => match probe_write(dir).await {
            Ok(()) => BackendState::Valid,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Write probe failed");
                BackendState::Unreachable("could not write in directory".to_string())
            },
        },
    }
}

async fn probe_write(dir: &Path) -> std::io::Result<()> {
    let marker = dir.join(format!("{}-{}", WRITE_PROBE_NAME, std::process::id()));
    tokio::fs::write(&marker, b"").await?;
    tokio::fs::remove_file(&marker).await
}

/// Validated local directory
#[derive(Debug)]
pub struct LocalDestination {
    dir: PathBuf,
}

impl LocalDestination {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `payload` under the directory and check the stored digest.
    ///
    /// `file_name` must stay inside the directory: absolute names and `..`
    /// components are rejected.
    pub async fn put(&self, file_name: &str, payload: Bytes) -> Result<()> {
        let path = self.resolve(file_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, &payload).await.map_err(|e| {
            EtlError::Storage(format!("could not write {}: {}", path.display(), e))
        })?;

        let expected = sha256_hex(&payload);
        let stored = {
            let written = path.clone();
            tokio::task::spawn_blocking(move || file_sha256_hex(written))
                .await
                .map_err(|e| EtlError::Storage(format!("checksum task failed: {}", e)))?
                .map_err(|e| {
                    EtlError::Storage(format!("could not read back {}: {}", path.display(), e))
                })?
        };
        if stored != expected {
            warn!(path = %path.display(), %expected, %stored, "Checksum mismatch after write");
            return Err(EtlError::Storage(format!(
                "checksum mismatch for {}",
                path.display()
            )));
        }

        debug!(path = %path.display(), bytes = payload.len(), sha256 = %stored, "Wrote file");
        Ok(())
    }

    fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        let relative = Path::new(file_name);
        let inside = !file_name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !inside {
            return Err(EtlError::Storage(format!(
                "file name {:?} is outside the storage directory",
                file_name
            )));
        }
        Ok(self.dir.join(relative))
    }
}
