//! Permission-guarded secret files
//!
//! Cloud credentials are read from single-line files that must be readable and
//! writable by their owner only (mode `0600`). Anything more permissive is
//! rejected before the content is even looked at.

use crate::error::{EtlError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Required permission bits for a secret file
pub const SECRET_FILE_MODE: u32 = 0o600;

/// Minimum length of an AWS secret access key
pub const MIN_AWS_SECRET_LEN: usize = 10;

/// What the secret is expected to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    /// Azure Storage connection string
    Azure,
    /// AWS secret access key
    Aws,
}

impl std::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretKind::Azure => f.write_str("Azure connection string"),
            SecretKind::Aws => f.write_str("AWS secret string"),
        }
    }
}

/// A secret held in memory only. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Read and validate the first line of a secret file.
///
/// # Errors
/// - [`EtlError::NotFound`] if `path` does not exist
/// - [`EtlError::Permission`] if the file mode is not exactly `0600`
/// - [`EtlError::Validation`] if the content does not look like `kind`
pub fn read_secret(path: impl AsRef<Path>, kind: SecretKind) -> Result<Secret> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(EtlError::NotFound(format!(
            "Secret file {:?} not found",
            path.display().to_string()
        )));
    }

    check_mode(path)?;

    let content = std::fs::read_to_string(path)?;
    let line = content.lines().next().unwrap_or_default().trim_end();

    match kind {
        SecretKind::Azure => {
            AzureConnectionString::parse_str(line).map_err(|_| not_understood(path, kind))?;
        },
        SecretKind::Aws => {
            if line.chars().count() < MIN_AWS_SECRET_LEN {
                return Err(not_understood(path, kind));
            }
        },
    }

    Ok(Secret(line.to_string()))
}

fn not_understood(path: &Path, kind: SecretKind) -> EtlError {
    EtlError::Validation(format!(
        "The data fetched from {:?} is not understood as an {}",
        path.display().to_string(),
        kind
    ))
}

#[cfg(unix)]
fn check_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
    if mode != SECRET_FILE_MODE {
        return Err(EtlError::Permission(format!(
            "The file {:?} should be protected (mode {:o}, expected {:o}); refusing to use it",
            path.display().to_string(),
            mode,
            SECRET_FILE_MODE
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_mode(path: &Path) -> Result<()> {
    Err(EtlError::Permission(format!(
        "Cannot verify permissions of {:?} on this platform",
        path.display().to_string()
    )))
}

/// Parsed `Key=Value;Key=Value` Azure Storage connection string
#[derive(Clone, PartialEq, Eq)]
pub struct AzureConnectionString {
    pairs: BTreeMap<String, String>,
}

impl AzureConnectionString {
    pub fn parse(secret: &Secret) -> Result<Self> {
        Self::parse_str(secret.expose())
    }

    /// At least two pairs, one of them `AccountKey`. Empty segments (a
    /// trailing `;`) are ignored.
    fn parse_str(raw: &str) -> Result<Self> {
        let mut pairs = BTreeMap::new();

        for item in raw.split(';').filter(|item| !item.trim().is_empty()) {
            let (key, value) = item.split_once('=').ok_or_else(|| {
                EtlError::Validation("connection string entry without '='".to_string())
            })?;
            pairs.insert(key.trim().to_string(), value.to_string());
        }

        if pairs.len() < 2 || !pairs.contains_key("AccountKey") {
            return Err(EtlError::Validation(
                "connection string needs at least two entries including AccountKey".to_string(),
            ));
        }

        Ok(Self { pairs })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn account_name(&self) -> Option<&str> {
        self.get("AccountName")
    }

    pub fn account_key(&self) -> Option<&str> {
        self.get("AccountKey")
    }

    /// Explicit blob endpoint, e.g. an Azurite emulator
    pub fn blob_endpoint(&self) -> Option<&str> {
        self.get("BlobEndpoint")
    }
}

impl std::fmt::Debug for AzureConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureConnectionString")
            .field("account_name", &self.account_name())
            .field("blob_endpoint", &self.blob_endpoint())
            .finish_non_exhaustive()
    }
}
