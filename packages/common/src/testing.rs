//! In-memory doubles for the storage seams, used by tests across the
//! workspace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::RecordStatus;
use crate::storage::{ObjectInfo, ObjectStore, StorageError};
use crate::store::{ProcessingStats, RecordOutcome, RecordStore, RecordStoreError, StoredRecord};

/// Record store kept in a vector. Can be told to reject saves.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<StoredRecord>>,
    next_id: AtomicI64,
    fail_saves: AtomicBool,
    saves_before_failure: Mutex<Option<usize>>,
    save_attempts: AtomicUsize,
    save_delay_ms: AtomicI64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `save` fail. `false` also clears
    /// [`fail_saves_after`](Self::fail_saves_after).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
        if !fail {
            *self.saves_before_failure.lock().unwrap() = None;
        }
    }

    /// Let the next `successes` saves through, then reject the rest.
    pub fn fail_saves_after(&self, successes: usize) {
        *self.saves_before_failure.lock().unwrap() = Some(successes);
    }

    /// Number of `save` calls, including rejected ones.
    pub fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }

    fn reject_save(&self) -> bool {
        if self.fail_saves.load(Ordering::SeqCst) {
            return true;
        }
        let mut left = self.saves_before_failure.lock().unwrap();
        match *left {
            Some(0) => true,
            Some(ref mut n) => {
                *n -= 1;
                false
            }
            None => false,
        }
    }

    /// Slow each `save` down, to observe in-flight behaviour.
    pub fn set_save_delay(&self, delay: Duration) {
        self.save_delay_ms
            .store(delay.as_millis() as i64, Ordering::SeqCst);
    }

    /// Snapshot of everything saved so far, in insertion order.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a fully-formed document, e.g. one with an old timestamp.
    pub fn insert_raw(&self, record: StoredRecord) {
        self.records.lock().unwrap().push(record);
    }

    fn sorted_by_index(mut records: Vec<StoredRecord>) -> Vec<StoredRecord> {
        records.sort_by_key(|r| (r.record_index, r.id));
        records
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn save(&self, outcome: RecordOutcome) -> Result<StoredRecord, RecordStoreError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = self.save_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.reject_save() {
            return Err(RecordStoreError::Unavailable("save rejected".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = outcome.into_stored(id, Utc::now());
        self.records.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn find_by_source_key(
        &self,
        source_key: &str,
    ) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let found = self
            .records()
            .into_iter()
            .filter(|r| r.source_key == source_key)
            .collect();
        Ok(Self::sorted_by_index(found))
    }

    async fn find_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let found = self
            .records()
            .into_iter()
            .filter(|r| r.message_id == message_id)
            .collect();
        Ok(Self::sorted_by_index(found))
    }

    async fn stats(&self) -> Result<ProcessingStats, RecordStoreError> {
        let records = self.records();
        let successes = records
            .iter()
            .filter(|r| r.status == RecordStatus::Success)
            .count() as u64;
        let errors = records.len() as u64 - successes;
        let total_time_ms = records.iter().map(|r| r.processing_time_ms).sum();
        Ok(ProcessingStats::from_counts(successes, errors, total_time_ms))
    }

    async fn recent(&self, limit: u64) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let mut records = self.records();
        records.sort_by(|a, b| {
            b.processing_timestamp
                .cmp(&a.processing_timestamp)
                .then(b.id.cmp(&a.id))
        });
        records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(records)
    }

    async fn prune_older_than(&self, days: u32) -> Result<u64, RecordStoreError> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.processing_timestamp >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

/// Object store over a map of keys to bytes.
pub struct InMemoryObjectStore {
    bucket: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failures_left: AtomicU32,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
            failures_left: AtomicU32::new(0),
        }
    }

    pub fn insert(&self, key: impl Into<String>, body: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.into(), body);
    }

    pub fn insert_json(&self, key: impl Into<String>, value: &serde_json::Value) {
        self.insert(key, value.to_string().into_bytes());
    }

    /// The next `n` calls fail with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    fn take_failure(&self) -> Result<(), StorageError> {
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            Err(StorageError::Transient("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.take_failure()?;
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn head(&self, key: &str) -> Result<ObjectInfo, StorageError> {
        self.take_failure()?;
        let size = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .map(|body| body.len() as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(ObjectInfo {
            key: key.to_string(),
            bucket: self.bucket.clone(),
            size: Some(size),
            last_modified: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordOrigin;
    use serde_json::json;

    fn outcome(message_id: &str, index: u64, ok: bool) -> RecordOutcome {
        let origin = RecordOrigin::new("file.json", message_id, index);
        if ok {
            RecordOutcome::success(origin, json!({"i": index}), json!({"i": index}), 2)
        } else {
            RecordOutcome::failure(origin, json!({"i": index}), "boom", 4)
        }
    }

    #[tokio::test]
    async fn test_stats_are_zero_when_empty() {
        let store = InMemoryRecordStore::new();
        assert_eq!(store.stats().await.unwrap(), ProcessingStats::default());
    }

    #[tokio::test]
    async fn test_stats_total_is_sum_of_statuses() {
        let store = InMemoryRecordStore::new();
        store.save(outcome("M1", 0, true)).await.unwrap();
        store.save(outcome("M1", 1, false)).await.unwrap();
        store.save(outcome("M2", 0, true)).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total, stats.successes + stats.errors);
        assert!((stats.avg_processing_time_ms - 8.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_find_orders_by_record_index() {
        let store = InMemoryRecordStore::new();
        for index in [2, 0, 1] {
            store.save(outcome("M1", index, true)).await.unwrap();
        }
        store.save(outcome("M2", 0, true)).await.unwrap();

        let found = store.find_by_message_id("M1").await.unwrap();
        let indexes: Vec<u64> = found.iter().map(|r| r.record_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);

        assert_eq!(store.find_by_source_key("file.json").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_duplicates_are_accepted() {
        let store = InMemoryRecordStore::new();
        store.save(outcome("M1", 0, true)).await.unwrap();
        store.save(outcome("M1", 0, true)).await.unwrap();
        assert_eq!(store.find_by_message_id("M1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_prune_only_removes_old_documents() {
        let store = InMemoryRecordStore::new();
        let fresh = store.save(outcome("M1", 0, true)).await.unwrap();

        let mut old = fresh.clone();
        old.id = 99;
        old.processing_timestamp = Utc::now() - chrono::Duration::days(40);
        store.insert_raw(old);

        assert_eq!(store.prune_older_than(30).await.unwrap(), 1);
        assert_eq!(store.records(), vec![fresh]);
    }

    #[tokio::test]
    async fn test_rejected_save_stores_nothing() {
        let store = InMemoryRecordStore::new();
        store.set_fail_saves(true);
        assert!(store.save(outcome("M1", 0, true)).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_fail_saves_after_lets_the_first_saves_through() {
        let store = InMemoryRecordStore::new();
        store.fail_saves_after(2);

        assert!(store.save(outcome("M1", 0, true)).await.is_ok());
        assert!(store.save(outcome("M1", 1, true)).await.is_ok());
        assert!(store.save(outcome("M1", 2, true)).await.is_err());
        assert_eq!(store.len(), 2);
        assert_eq!(store.save_attempts(), 3);

        store.set_fail_saves(false);
        assert!(store.save(outcome("M1", 2, true)).await.is_ok());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_limited() {
        let store = InMemoryRecordStore::new();
        for index in 0..5 {
            store.save(outcome("M1", index, true)).await.unwrap();
        }

        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].processing_timestamp >= recent[1].processing_timestamp);
        assert_eq!(recent[0].record_index, 4);
    }
}
