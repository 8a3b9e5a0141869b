//! Storage types

use async_trait::async_trait;

use crate::error::StorageError;

/// Bucket and key of an object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Read access to object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full contents of an object
    ///
    /// Fails with `StorageError::ObjectNotFound` if the object does not exist.
    async fn get_bytes(&self, location: &ObjectLocation) -> Result<Vec<u8>, StorageError>;
}
