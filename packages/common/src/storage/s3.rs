use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::traits::{ObjectInfo, ObjectStore};
use crate::config::StorageAppConfig;

/// S3-backed object store (AWS or any S3-compatible endpoint).
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    name: String,
}

impl S3ObjectStore {
    /// Build a store for the configured bucket. Credentials come from the
    /// usual AWS environment variables, profile or instance metadata.
    pub fn from_config(config: &StorageAppConfig) -> Result<Self, StorageError> {
        let name = config
            .bucket_name()
            .ok_or_else(|| StorageError::Config("no bucket configured".into()))?
            .to_string();

        let region = match &config.endpoint_url {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Config(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::default()
            .map_err(|e| StorageError::Config(format!("credentials: {e}")))?;

        let mut bucket = Bucket::new(&name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket, name })
    }
}

fn map_s3_error(key: &str, err: S3Error) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        S3Error::HttpFailWithBody(status, body) if (400..500).contains(&status) => {
            StorageError::Config(format!("HTTP {status}: {body}"))
        }
        other => StorageError::Transient(other.to_string()),
    }
}

fn check_status(key: &str, status: u16) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        400..=499 => Err(StorageError::Config(format!("HTTP {status} for {key}"))),
        _ => Err(StorageError::Transient(format!("HTTP {status} for {key}"))),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| map_s3_error(key, e))?;
        check_status(key, response.status_code())?;
        Ok(response.bytes().to_vec())
    }

    async fn head(&self, key: &str) -> Result<ObjectInfo, StorageError> {
        let (head, status) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| map_s3_error(key, e))?;
        check_status(key, status)?;
        Ok(ObjectInfo {
            key: key.to_string(),
            bucket: self.name.clone(),
            size: head.content_length.and_then(|len| u64::try_from(len).ok()),
            last_modified: head.last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(check_status("k", 200).is_ok());
        assert!(check_status("k", 404).unwrap_err().is_not_found());
        assert!(matches!(check_status("k", 403), Err(StorageError::Config(_))));
        assert!(matches!(check_status("k", 503), Err(StorageError::Transient(_))));
    }

    #[test]
    fn test_missing_bucket_is_config_error() {
        let err = S3ObjectStore::from_config(&StorageAppConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
