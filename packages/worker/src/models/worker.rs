use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use mq::{MessageQueue, MqError, QueueMessage, ReceiveOptions};
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::handlers::MessageHandler;

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub receive: ReceiveOptions,
    /// Pause after a receive that returned nothing.
    pub empty_poll_delay: Duration,
    /// Pause after a failed receive.
    pub error_backoff: Duration,
    /// Handle messages of the same message group one after another.
    pub serialize_message_groups: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            receive: ReceiveOptions::long_poll(),
            empty_poll_delay: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
            serialize_message_groups: false,
        }
    }
}

/// Outcome of one receive-and-handle iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub acked: usize,
    pub failed: usize,
}

/// Stops the polling loop after the batch in progress.
#[derive(Clone)]
pub struct StopHandle {
    polling: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    fn new() -> Self {
        Self {
            polling: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn stop(&self) {
        self.polling.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early on stop.
    async fn idle(&self, duration: Duration) {
        let notified = self.notify.notified();
        if !self.is_polling() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = notified => {}
        }
    }
}

/// Long-polls the queue and hands each message to the [`MessageHandler`].
///
/// A message is deleted only after its handler returned `Ok`, i.e. after
/// every record reached the store. Anything else leaves it in flight for
/// the queue to redeliver and, eventually, dead-letter.
pub struct IngestionWorker {
    id: String,
    queue: Arc<dyn MessageQueue>,
    handler: Arc<MessageHandler>,
    settings: WorkerSettings,
    stop: StopHandle,
}

impl IngestionWorker {
    pub fn new(
        id: impl Into<String>,
        queue: Arc<dyn MessageQueue>,
        handler: Arc<MessageHandler>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            id: id.into(),
            queue,
            handler,
            settings,
            stop: StopHandle::new(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.stop.is_polling()
    }

    /// Poll until stopped. Receive errors never end the loop.
    pub async fn run(&self) {
        info!(
            worker_id = %self.id,
            queue_url = %self.queue.queue_url(),
            max_messages = self.settings.receive.max_messages,
            wait_time_secs = self.settings.receive.wait_time.as_secs(),
            serialize_message_groups = self.settings.serialize_message_groups,
            "Ingestion worker started"
        );

        while self.stop.is_polling() {
            match self.poll_once().await {
                Ok(report) if report.received == 0 => {
                    self.stop.idle(self.settings.empty_poll_delay).await;
                }
                Ok(report) => {
                    info!(
                        worker_id = %self.id,
                        received = report.received,
                        acked = report.acked,
                        failed = report.failed,
                        "Batch processed"
                    );
                }
                Err(e) => {
                    error!(worker_id = %self.id, error = %e, "Failed to receive messages");
                    self.stop.idle(self.settings.error_backoff).await;
                }
            }
        }

        info!(worker_id = %self.id, "Ingestion worker stopped");
    }

    /// One receive followed by handling of the whole batch.
    pub async fn poll_once(&self) -> Result<BatchReport, MqError> {
        let messages = self.queue.receive(&self.settings.receive).await?;
        if messages.is_empty() {
            debug!(worker_id = %self.id, "No messages");
            return Ok(BatchReport::default());
        }
        Ok(self.process_batch(messages).await)
    }

    /// Handle a batch concurrently. With group serialization enabled,
    /// messages sharing a group run in receive order within one lane.
    pub async fn process_batch(&self, messages: Vec<QueueMessage>) -> BatchReport {
        let received = messages.len();
        let lanes = self.lanes(messages);

        let acked_per_lane = join_all(lanes.into_iter().map(|lane| async move {
            let mut acked = 0;
            for message in lane {
                if self.handle_and_ack(message).await {
                    acked += 1;
                }
            }
            acked
        }))
        .await;

        let acked: usize = acked_per_lane.into_iter().sum();
        BatchReport {
            received,
            acked,
            failed: received - acked,
        }
    }

    fn lanes(&self, messages: Vec<QueueMessage>) -> Vec<Vec<QueueMessage>> {
        if !self.settings.serialize_message_groups {
            return messages.into_iter().map(|m| vec![m]).collect();
        }

        let mut lanes: Vec<Vec<QueueMessage>> = Vec::new();
        let mut by_group: HashMap<String, usize> = HashMap::new();
        for message in messages {
            match message.group_id().map(str::to_string) {
                Some(group) => match by_group.get(&group) {
                    Some(&lane) => lanes[lane].push(message),
                    None => {
                        by_group.insert(group, lanes.len());
                        lanes.push(vec![message]);
                    }
                },
                None => lanes.push(vec![message]),
            }
        }
        lanes
    }

    /// Returns whether the message was acknowledged.
    async fn handle_and_ack(&self, message: QueueMessage) -> bool {
        let message_id = message.message_id.as_str();

        match self.handler.handle(&message).await {
            Ok(report) => match self.queue.delete(&message.receipt_handle).await {
                Ok(()) => {
                    info!(
                        message_id,
                        source_key = %report.source_key,
                        records = report.records,
                        succeeded = report.succeeded,
                        failed = report.failed,
                        "Message processed and acknowledged"
                    );
                    true
                }
                Err(e) => {
                    error!(
                        message_id,
                        error = %e,
                        "Failed to delete processed message, it will be redelivered"
                    );
                    false
                }
            },
            Err(e) => {
                error!(
                    message_id,
                    kind = e.kind(),
                    receive_count = ?message.receive_count(),
                    error = %e,
                    "Message handling failed, leaving it for redelivery"
                );
                false
            }
        }
    }
}
