use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::error::StorageError;
use super::normalize::normalize_records;
use super::traits::{ObjectInfo, ObjectStore};
use crate::retry::{RetryPolicy, retry_transient};

/// Fetches JSON files from one bucket and turns them into record lists.
///
/// Every storage call is retried locally on transient failures; anything
/// still failing after the policy is exhausted propagates to the caller.
#[derive(Clone)]
pub struct ObjectFetcher {
    store: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
}

impl ObjectFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn bucket(&self) -> &str {
        self.store.bucket()
    }

    /// GET the object, decode UTF-8, parse JSON and normalize.
    pub async fn fetch_records(&self, key: &str) -> Result<Vec<Value>, StorageError> {
        let bytes = retry_transient(&self.retry, "storage.get", || self.store.get(key)).await?;
        let records = parse_records(key, &bytes)?;
        debug!(key, bucket = self.bucket(), count = records.len(), "Fetched records");
        Ok(records)
    }

    /// `false` only when the object is missing; other errors propagate.
    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match retry_transient(&self.retry, "storage.head", || self.store.head(key)).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn stat(&self, key: &str) -> Result<ObjectInfo, StorageError> {
        retry_transient(&self.retry, "storage.head", || self.store.head(key)).await
    }
}

/// Decode and normalize an object body.
pub fn parse_records(key: &str, bytes: &[u8]) -> Result<Vec<Value>, StorageError> {
    if bytes.is_empty() {
        return Err(StorageError::malformed(key, "empty body"));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| StorageError::malformed(key, format!("invalid UTF-8: {e}")))?;
    let value: Value = serde_json::from_str(text)
        .map_err(|e| StorageError::malformed(key, format!("invalid JSON: {e}")))?;
    Ok(normalize_records(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryObjectStore;
    use serde_json::json;

    fn fetcher(store: Arc<InMemoryObjectStore>) -> ObjectFetcher {
        ObjectFetcher::new(store, RetryPolicy::new(3, 1, 2))
    }

    #[tokio::test]
    async fn test_fetch_normalizes_records_field() {
        let store = Arc::new(InMemoryObjectStore::new("ingest"));
        store.insert_json("batch.json", &json!({"records": [{"a": 1}, {"b": 2}]}));

        let records = fetcher(store).fetch_records("batch.json").await.unwrap();
        assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = Arc::new(InMemoryObjectStore::new("ingest"));
        let fetcher = fetcher(store);

        assert!(!fetcher.exists("nope.json").await.unwrap());
        let err = fetcher.fetch_records("nope.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_bodies() {
        let store = Arc::new(InMemoryObjectStore::new("ingest"));
        store.insert("empty.json", Vec::new());
        store.insert("binary.json", vec![0xff, 0xfe, 0x00]);
        store.insert("broken.json", b"{\"a\":".to_vec());
        let fetcher = fetcher(store);

        for key in ["empty.json", "binary.json", "broken.json"] {
            let err = fetcher.fetch_records(key).await.unwrap_err();
            assert!(
                matches!(err, StorageError::MalformedPayload { .. }),
                "{key}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_then_propagate() {
        let store = Arc::new(InMemoryObjectStore::new("ingest"));
        store.insert_json("a.json", &json!([1]));
        store.fail_next(2);
        let fetcher = fetcher(store.clone());

        assert_eq!(fetcher.fetch_records("a.json").await.unwrap(), vec![json!(1)]);

        store.fail_next(3);
        let err = fetcher.exists("a.json").await.unwrap_err();
        assert!(matches!(err, StorageError::Transient(_)));
    }

    #[tokio::test]
    async fn test_stat_reports_size_and_bucket() {
        let store = Arc::new(InMemoryObjectStore::new("ingest"));
        store.insert("a.json", b"[1,2]".to_vec());

        let info = fetcher(store).stat("a.json").await.unwrap();
        assert_eq!(info.bucket, "ingest");
        assert_eq!(info.size, Some(5));
    }
}
