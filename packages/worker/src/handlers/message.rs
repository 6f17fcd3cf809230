use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use common::storage::ObjectFetcher;
use common::store::{RecordOrigin, RecordOutcome, RecordStore};
use futures::stream::{self, StreamExt};
use mq::QueueMessage;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::HandlerError;
use crate::models::envelope::{DIRECT_SOURCE_KEY, Dispatch, LEGACY_SOURCE_KEY, classify};
use crate::models::processor::RecordProcessor;

#[derive(Debug, Clone, Copy)]
pub struct HandlerSettings {
    /// Records of one message processed at the same time. Zero means one.
    pub record_concurrency: usize,
    /// Per-record work time used for the visibility budget estimate.
    pub work_delay: Duration,
    /// Visibility window of the queue.
    pub visibility_timeout: Duration,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            record_concurrency: 1,
            work_delay: Duration::ZERO,
            visibility_timeout: Duration::from_secs(250),
        }
    }
}

/// What happened to one message's records. Only produced when every
/// record reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReport {
    pub source_key: String,
    pub records: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// The handler task run for each received message.
pub struct MessageHandler {
    fetcher: Option<ObjectFetcher>,
    store: Arc<dyn RecordStore>,
    processor: Arc<dyn RecordProcessor>,
    settings: HandlerSettings,
}

impl MessageHandler {
    /// `fetcher` is `None` when no bucket is configured; `s3_file` messages
    /// then fail and follow the redelivery path.
    pub fn new(
        fetcher: Option<ObjectFetcher>,
        store: Arc<dyn RecordStore>,
        processor: Arc<dyn RecordProcessor>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            processor,
            settings,
        }
    }

    pub async fn handle(&self, message: &QueueMessage) -> Result<MessageReport, HandlerError> {
        self.classify_and_dispatch(&message.body, &message.message_id)
            .await
    }

    pub async fn classify_and_dispatch(
        &self,
        body: &str,
        message_id: &str,
    ) -> Result<MessageReport, HandlerError> {
        let dispatch = classify(body)?;
        debug!(message_id, kind = dispatch.kind(), "Classified message");

        match dispatch {
            Dispatch::S3File { key, metadata } => {
                if let Some(metadata) = metadata {
                    debug!(message_id, key = %key, metadata = %metadata, "File metadata");
                }
                self.handle_s3_file(&key, message_id).await
            }
            Dispatch::DirectData { data } => {
                self.process_records(DIRECT_SOURCE_KEY, message_id, vec![data])
                    .await
            }
            Dispatch::Legacy { record } => {
                self.process_records(LEGACY_SOURCE_KEY, message_id, vec![record])
                    .await
            }
        }
    }

    async fn handle_s3_file(
        &self,
        key: &str,
        message_id: &str,
    ) -> Result<MessageReport, HandlerError> {
        let fetcher = self.fetcher.as_ref().ok_or_else(|| {
            HandlerError::StorageUnavailable("no bucket configured".into())
        })?;

        if !fetcher.exists(key).await? {
            return Err(HandlerError::NotFound(key.to_string()));
        }

        match fetcher.stat(key).await {
            Ok(info) => debug!(
                message_id,
                key,
                bucket = %info.bucket,
                size = ?info.size,
                last_modified = ?info.last_modified,
                "Object found"
            ),
            Err(e) => debug!(message_id, key, error = %e, "Could not stat object"),
        }

        let records = fetcher.fetch_records(key).await?;
        info!(message_id, key, records = records.len(), "Processing file");
        self.check_visibility_budget(message_id, key, records.len());

        self.process_records(key, message_id, records).await
    }

    fn concurrency(&self) -> usize {
        self.settings.record_concurrency.max(1)
    }

    /// Worst-case time to work through `record_count` records at the
    /// configured concurrency. I/O is not included.
    pub fn estimated_duration(&self, record_count: usize) -> Duration {
        let rounds = record_count.div_ceil(self.concurrency());
        self.settings
            .work_delay
            .saturating_mul(u32::try_from(rounds).unwrap_or(u32::MAX))
    }

    fn check_visibility_budget(&self, message_id: &str, key: &str, record_count: usize) {
        let estimate = self.estimated_duration(record_count);
        if !estimate.is_zero() && estimate >= self.settings.visibility_timeout {
            warn!(
                message_id,
                key,
                records = record_count,
                concurrency = self.concurrency(),
                estimate_secs = estimate.as_secs(),
                visibility_timeout_secs = self.settings.visibility_timeout.as_secs(),
                "File may outlast the visibility timeout and be redelivered"
            );
        }
    }

    /// Run every record through the processor and save one outcome each.
    ///
    /// Processor failures become error documents. The first save failure
    /// fails the message: records not yet started are skipped, saves already
    /// in flight finish.
    pub async fn process_records(
        &self,
        source_key: &str,
        message_id: &str,
        records: Vec<Value>,
    ) -> Result<MessageReport, HandlerError> {
        let total = records.len();
        let aborted = AtomicBool::new(false);

        let results: Vec<Option<Result<bool, HandlerError>>> =
            stream::iter(records.into_iter().enumerate())
                .map(|(index, record)| {
                    let aborted = &aborted;
                    async move {
                        if aborted.load(Ordering::SeqCst) {
                            return None;
                        }
                        let result = self.process_one(source_key, message_id, index, record).await;
                        if result.is_err() {
                            aborted.store(true, Ordering::SeqCst);
                        }
                        Some(result)
                    }
                })
                .buffer_unordered(self.concurrency())
                .collect()
                .await;

        let mut succeeded = 0;
        let mut failed = 0;
        for result in results.into_iter().flatten() {
            match result? {
                true => succeeded += 1,
                false => failed += 1,
            }
        }

        Ok(MessageReport {
            source_key: source_key.to_string(),
            records: total,
            succeeded,
            failed,
        })
    }

    /// Returns whether the processor succeeded for this record.
    async fn process_one(
        &self,
        source_key: &str,
        message_id: &str,
        index: usize,
        record: Value,
    ) -> Result<bool, HandlerError> {
        let record_index = index as u64;

        let started = Instant::now();
        let result = self.processor.process(&record, record_index).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let origin = RecordOrigin::new(source_key, message_id, record_index);
        let outcome = match result {
            Ok(output) => RecordOutcome::success(origin, record, output, elapsed_ms),
            Err(e) => {
                warn!(message_id, source_key, record_index, error = %e, "Record processing failed");
                RecordOutcome::failure(origin, record, e.to_string(), elapsed_ms)
            }
        };
        let succeeded = outcome.status().is_success();

        self.store.save(outcome).await?;
        Ok(succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::processor::MergeProcessor;
    use common::testing::InMemoryRecordStore;

    fn handler(concurrency: usize, work_delay_ms: u64, visibility_secs: u64) -> MessageHandler {
        MessageHandler::new(
            None,
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(MergeProcessor::default()),
            HandlerSettings {
                record_concurrency: concurrency,
                work_delay: Duration::from_millis(work_delay_ms),
                visibility_timeout: Duration::from_secs(visibility_secs),
            },
        )
    }

    #[test]
    fn test_estimated_duration() {
        let h = handler(4, 100, 250);
        assert_eq!(h.estimated_duration(0), Duration::ZERO);
        assert_eq!(h.estimated_duration(4), Duration::from_millis(100));
        assert_eq!(h.estimated_duration(9), Duration::from_millis(300));

        assert_eq!(handler(0, 100, 250).estimated_duration(3), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_s3_file_without_bucket_is_storage_unavailable() {
        let h = handler(1, 0, 250);
        let err = h
            .classify_and_dispatch(r#"{"type":"s3_file","key":"a.json"}"#, "M1")
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_record_list_succeeds_without_documents() {
        let report = handler(1, 0, 250)
            .process_records("empty.json", "M1", Vec::new())
            .await
            .unwrap();
        assert_eq!(report.records, 0);
        assert_eq!(report.succeeded + report.failed, 0);
    }
}
