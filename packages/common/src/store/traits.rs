use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::error::RecordStoreError;
use crate::RecordStatus;

const UNKNOWN_ERROR: &str = "unknown processing error";

/// Where a record came from: the natural identity of an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOrigin {
    pub source_key: String,
    pub message_id: String,
    pub record_index: u64,
}

impl RecordOrigin {
    pub fn new(
        source_key: impl Into<String>,
        message_id: impl Into<String>,
        record_index: u64,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            message_id: message_id.into(),
            record_index,
        }
    }
}

/// One record's processing result, ready to be persisted.
///
/// Built only through [`RecordOutcome::success`] and [`RecordOutcome::failure`]
/// so that `error_message` is set exactly when `status` is `Error`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    origin: RecordOrigin,
    original_data: Value,
    processed_data: Option<Value>,
    processing_timestamp: DateTime<Utc>,
    status: RecordStatus,
    error_message: Option<String>,
    processing_time_ms: u64,
}

impl RecordOutcome {
    pub fn success(
        origin: RecordOrigin,
        original: Value,
        processed: Value,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            origin,
            original_data: original,
            processed_data: Some(processed),
            processing_timestamp: Utc::now(),
            status: RecordStatus::Success,
            error_message: None,
            processing_time_ms,
        }
    }

    /// An empty message is replaced so that error documents always explain
    /// themselves.
    pub fn failure(
        origin: RecordOrigin,
        original: Value,
        error_message: impl Into<String>,
        processing_time_ms: u64,
    ) -> Self {
        let mut error_message = error_message.into();
        if error_message.trim().is_empty() {
            error_message = UNKNOWN_ERROR.to_string();
        }
        Self {
            origin,
            original_data: original,
            processed_data: None,
            processing_timestamp: Utc::now(),
            status: RecordStatus::Error,
            error_message: Some(error_message),
            processing_time_ms,
        }
    }

    pub fn origin(&self) -> &RecordOrigin {
        &self.origin
    }
    pub fn original_data(&self) -> &Value {
        &self.original_data
    }
    pub fn processed_data(&self) -> Option<&Value> {
        self.processed_data.as_ref()
    }
    pub fn processing_timestamp(&self) -> DateTime<Utc> {
        self.processing_timestamp
    }
    pub fn status(&self) -> RecordStatus {
        self.status
    }
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
    pub fn processing_time_ms(&self) -> u64 {
        self.processing_time_ms
    }

    /// Attach the store-assigned fields.
    pub fn into_stored(self, id: i64, stored_at: DateTime<Utc>) -> StoredRecord {
        StoredRecord {
            id,
            source_key: self.origin.source_key,
            message_id: self.origin.message_id,
            record_index: self.origin.record_index,
            original_data: self.original_data,
            processed_data: self.processed_data,
            processing_timestamp: self.processing_timestamp,
            status: self.status,
            error_message: self.error_message,
            processing_time_ms: self.processing_time_ms,
            created_at: stored_at,
            updated_at: stored_at,
        }
    }
}

/// An outcome document as persisted, including store-assigned fields.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct StoredRecord {
    pub id: i64,
    pub source_key: String,
    pub message_id: String,
    pub record_index: u64,
    pub original_data: Value,
    pub processed_data: Option<Value>,
    pub processing_timestamp: DateTime<Utc>,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counters over all outcome documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ProcessingStats {
    pub total: u64,
    pub successes: u64,
    pub errors: u64,
    pub avg_processing_time_ms: f64,
}

impl ProcessingStats {
    /// Build from per-status counts and the summed processing time.
    pub fn from_counts(successes: u64, errors: u64, total_time_ms: u64) -> Self {
        let total = successes + errors;
        let avg_processing_time_ms = if total == 0 {
            0.0
        } else {
            total_time_ms as f64 / total as f64
        };
        Self {
            total,
            successes,
            errors,
            avg_processing_time_ms,
        }
    }
}

/// Append-only persistence of per-record outcomes.
///
/// Writes are visible to later reads from the same process. Duplicate
/// outcomes for the same origin are accepted.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save(&self, outcome: RecordOutcome) -> Result<StoredRecord, RecordStoreError>;

    /// Ordered by `record_index` ascending.
    async fn find_by_source_key(
        &self,
        source_key: &str,
    ) -> Result<Vec<StoredRecord>, RecordStoreError>;

    /// Ordered by `record_index` ascending.
    async fn find_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Vec<StoredRecord>, RecordStoreError>;

    async fn stats(&self) -> Result<ProcessingStats, RecordStoreError>;

    /// Newest `processing_timestamp` first.
    async fn recent(&self, limit: u64) -> Result<Vec<StoredRecord>, RecordStoreError>;

    /// Delete documents processed more than `days` days ago. Returns the
    /// number of deleted documents.
    async fn prune_older_than(&self, days: u32) -> Result<u64, RecordStoreError>;
}
