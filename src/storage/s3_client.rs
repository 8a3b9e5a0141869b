//! S3-compatible storage client
//!
//! Wraps the AWS SDK for S3-compatible storage access.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::{error::DisplayErrorContext, Client};

use crate::config::AwsConfig;
use crate::error::StorageError;

use super::types::{ObjectLocation, ObjectStore};

/// S3-compatible storage client
///
/// Unlike a single-bucket client, every call names its bucket: requests
/// carry their own document locations.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Create a new S3 client from the shared SDK configuration
    pub fn new(sdk_config: &SdkConfig, config: &AwsConfig) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);

        if let Some(endpoint) = &config.s3_endpoint {
            tracing::info!("Using S3 endpoint override: {}", endpoint);
            builder = builder
                .endpoint_url(endpoint)
                .force_path_style(true); // Required for MinIO and other S3-compatible services
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn get_bytes(&self, location: &ObjectLocation) -> Result<Vec<u8>, StorageError> {
        tracing::debug!("Fetching {}", location);

        let response = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                let status = e.raw_response().map(|r| r.status().as_u16());

                if not_found || status == Some(404) {
                    StorageError::ObjectNotFound {
                        bucket: location.bucket.clone(),
                        key: location.key.clone(),
                    }
                } else if status == Some(403) {
                    StorageError::AccessDenied(location.to_string())
                } else {
                    StorageError::SdkError(format!(
                        "Failed to get object {}: {}",
                        location,
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::SdkError(format!("Failed to read object body: {}", e)))?
            .into_bytes()
            .to_vec();

        tracing::debug!("Fetched {} ({} bytes)", location, data.len());
        Ok(data)
    }
}
