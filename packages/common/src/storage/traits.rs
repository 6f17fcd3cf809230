use async_trait::async_trait;
use serde::Serialize;

use super::error::StorageError;

/// Informational metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub bucket: String,
    pub size: Option<u64>,
    pub last_modified: Option<String>,
}

/// Read-only access to a single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket name fixed at construction.
    fn bucket(&self) -> &str;

    /// Retrieve all bytes of an object.
    ///
    /// Returns `StorageError::NotFound` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// HEAD-equivalent lookup.
    ///
    /// Returns `StorageError::NotFound` when the key does not exist.
    async fn head(&self, key: &str) -> Result<ObjectInfo, StorageError>;
}
