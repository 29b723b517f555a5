//! AWS S3 backend
//!
//! The bucket is probed with `HeadBucket`. A missing bucket is created, like a
//! missing local directory; creation failure is reported as
//! `bucket not in storage`, and a 403 as `access denied to bucket`.

use super::backend::{BackendRef, BackendState, Connection, Destination};
use crate::error::{EtlError, Result};
use crate::secret::{read_secret, SecretKind};
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use bytes::Bytes;
use std::path::PathBuf;
use tracing::{debug, info};

/// Default AWS region when none is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    /// File holding the secret access key (mode 0600)
    pub secret_file: Option<PathBuf>,
    /// Access key id
    pub key: Option<String>,
    pub bucket: Option<String>,
    pub region: String,
    /// Custom endpoint for S3-compatible stores; enables path-style addressing
    pub endpoint: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            secret_file: None,
            key: None,
            bucket: None,
            region: DEFAULT_AWS_REGION.to_string(),
            endpoint: None,
        }
    }
}

impl AwsConfig {
    pub fn new(
        secret_file: impl Into<PathBuf>,
        key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            secret_file: Some(secret_file.into()),
            key: Some(key.into()),
            bucket: Some(bucket.into()),
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub async fn connect(self) -> Connection {
        let Some(secret_file) = self.secret_file.as_ref() else {
            return unset("secret");
        };
        let Some(key) = self.key.as_deref().filter(|k| !k.is_empty()) else {
            return unset("key");
        };
        let Some(bucket) = self.bucket.clone().filter(|b| !b.is_empty()) else {
            return unset("bucket");
        };

        if bucket.contains('/') {
            return Connection::invalid(
                BackendRef::Aws,
                BackendState::NotAContainer(format!("Expected to be a Bucket: {}", bucket)),
            );
        }

        let secret = match read_secret(secret_file, SecretKind::Aws) {
            Ok(secret) => secret,
            Err(e) => {
                return Connection::invalid(BackendRef::Aws, BackendState::Unreachable(e.to_string()))
            },
        };

        let client = self.client(key, secret.expose());

        match probe_bucket(&client, &bucket, &self.region).await {
            BackendState::Valid => Connection::valid(Destination::Aws(AwsDestination { client, bucket })),
            state => Connection::invalid(BackendRef::Aws, state),
        }
    }

    fn client(&self, key: &str, secret: &str) -> Client {
        let credentials = Credentials::new(key, secret, None, None, "firds-etl");

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(self.region.clone()));

        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Client::from_conf(builder.build())
    }
}

fn unset(resource: &'static str) -> Connection {
    Connection::invalid(BackendRef::Aws, BackendState::Unset(resource))
}

async fn probe_bucket(client: &Client, bucket: &str, region: &str) -> BackendState {
    let err = match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => return BackendState::Valid,
        Err(err) => err,
    };

    let status = err.raw_response().map(|r| r.status().as_u16());
    let not_found = err.as_service_error().is_some_and(|e| e.is_not_found());
    debug!(%bucket, ?status, error = %DisplayErrorContext(&err), "HeadBucket failed");

    match status {
        Some(403) => BackendState::Unreachable("access denied to bucket".to_string()),
        Some(404) => create_bucket(client, bucket, region).await,
        _ if not_found => create_bucket(client, bucket, region).await,
        _ => BackendState::Unreachable(format!(
            "could not reach bucket: {}",
            DisplayErrorContext(&err)
        )),
    }
}

async fn create_bucket(client: &Client, bucket: &str, region: &str) -> BackendState {
    let mut request = client.create_bucket().bucket(bucket);

    // us-east-1 rejects an explicit location constraint
    if region != DEFAULT_AWS_REGION {
        request = request.create_bucket_configuration(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        );
    }

    match request.send().await {
        Ok(_) => {
            info!(%bucket, %region, "Created bucket");
            BackendState::Valid
        },
        Err(e) => {
            debug!(%bucket, error = %DisplayErrorContext(&e), "CreateBucket failed");
            BackendState::Unreachable("bucket not in storage".to_string())
        },
    }
}

/// Validated S3 bucket
#[derive(Debug)]
pub struct AwsDestination {
    client: Client,
    bucket: String,
}

impl AwsDestination {
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn put(&self, file_name: &str, payload: Bytes) -> Result<()> {
        let size = payload.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(file_name)
            .content_type("text/csv")
            .body(ByteStream::from(payload))
            .send()
            .await
            .map_err(|e| {
                EtlError::Storage(format!(
                    "could not upload s3://{}/{}: {}",
                    self.bucket,
                    file_name,
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(bucket = %self.bucket, key = %file_name, bytes = size, "Uploaded object");
        Ok(())
    }
}
