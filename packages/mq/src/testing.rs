//! In-memory queue with the delivery semantics the ingestion worker relies
//! on: hidden while in flight, redelivered after visibility expiry, moved to
//! a dead-letter list once the receive count exceeds `max_receive_count`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::ReceiveOptions;
use crate::error::MqError;
use crate::models::{ATTR_MESSAGE_GROUP_ID, ATTR_RECEIVE_COUNT, MessageQueue, QueueMessage};

#[derive(Debug, Clone)]
struct Entry {
    message_id: String,
    body: String,
    group_id: Option<String>,
    receive_count: u32,
    /// Set while in flight.
    receipt_handle: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<Entry>,
    dead_letters: Vec<QueueMessage>,
    acked: Vec<String>,
    sent: Vec<QueueMessage>,
}

pub struct InMemoryQueue {
    queue_url: String,
    max_receive_count: u32,
    state: Mutex<State>,
    failing_receives: AtomicU32,
    failing_deletes: AtomicU32,
    receive_calls: AtomicU32,
}

impl InMemoryQueue {
    pub const DEFAULT_URL: &'static str = "http://localhost:4566/000000000000/ingest.fifo";

    pub fn new() -> Self {
        Self::with_url(Self::DEFAULT_URL)
    }

    pub fn with_url(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            max_receive_count: 3,
            state: Mutex::new(State::default()),
            failing_receives: AtomicU32::new(0),
            failing_deletes: AtomicU32::new(0),
            receive_calls: AtomicU32::new(0),
        }
    }

    pub fn with_max_receive_count(mut self, max_receive_count: u32) -> Self {
        self.max_receive_count = max_receive_count;
        self
    }

    /// Enqueue with a chosen message id.
    pub fn push(&self, message_id: impl Into<String>, body: impl Into<String>) {
        self.push_to_group(message_id, body, None);
    }

    pub fn push_to_group(
        &self,
        message_id: impl Into<String>,
        body: impl Into<String>,
        group_id: Option<&str>,
    ) {
        self.state.lock().unwrap().entries.push(Entry {
            message_id: message_id.into(),
            body: body.into(),
            group_id: group_id.map(str::to_string),
            receive_count: 0,
            receipt_handle: None,
        });
    }

    /// Let every in-flight message's visibility window lapse.
    pub fn expire_in_flight(&self) {
        for entry in self.state.lock().unwrap().entries.iter_mut() {
            entry.receipt_handle = None;
        }
    }

    /// The next `n` receive calls fail.
    pub fn fail_next_receives(&self, n: u32) {
        self.failing_receives.store(n, Ordering::SeqCst);
    }

    /// The next `n` delete calls fail.
    pub fn fail_next_deletes(&self, n: u32) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    pub fn receive_calls(&self) -> u32 {
        self.receive_calls.load(Ordering::SeqCst)
    }

    /// Ids of acknowledged messages, in ack order.
    pub fn acked(&self) -> Vec<String> {
        self.state.lock().unwrap().acked.clone()
    }

    pub fn dead_letters(&self) -> Vec<QueueMessage> {
        self.state.lock().unwrap().dead_letters.clone()
    }

    /// Messages enqueued through [`MessageQueue::send`].
    pub fn sent(&self) -> Vec<QueueMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn in_flight_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|e| e.receipt_handle.is_some())
            .count()
    }

    /// Messages still owned by the queue, visible or in flight.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn to_message(entry: &Entry, receipt_handle: String) -> QueueMessage {
        let mut attributes = HashMap::from([(
            ATTR_RECEIVE_COUNT.to_string(),
            entry.receive_count.to_string(),
        )]);
        if let Some(group) = &entry.group_id {
            attributes.insert(ATTR_MESSAGE_GROUP_ID.to_string(), group.clone());
        }
        QueueMessage {
            message_id: entry.message_id.clone(),
            receipt_handle,
            body: entry.body.clone(),
            attributes,
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    fn queue_url(&self) -> &str {
        &self.queue_url
    }

    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, MqError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take(&self.failing_receives) {
            return Err(MqError::Receive("injected receive failure".into()));
        }

        let limit = options.clamped().max_messages as usize;
        let mut state = self.state.lock().unwrap();
        let State {
            entries,
            dead_letters,
            ..
        } = &mut *state;

        // Visible messages that already used up their receives go to the DLQ.
        let max_receive_count = self.max_receive_count;
        entries.retain(|entry| {
            let exhausted =
                entry.receipt_handle.is_none() && entry.receive_count >= max_receive_count;
            if exhausted {
                dead_letters.push(Self::to_message(entry, String::new()));
            }
            !exhausted
        });

        let mut delivered = Vec::new();
        for entry in entries.iter_mut() {
            if delivered.len() >= limit {
                break;
            }
            if entry.receipt_handle.is_some() {
                continue;
            }
            let handle = Uuid::new_v4().to_string();
            entry.receive_count += 1;
            entry.receipt_handle = Some(handle.clone());
            delivered.push(Self::to_message(entry, handle));
        }

        Ok(delivered)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), MqError> {
        if Self::take(&self.failing_deletes) {
            return Err(MqError::Delete("injected delete failure".into()));
        }

        let mut state = self.state.lock().unwrap();
        let position = state
            .entries
            .iter()
            .position(|e| e.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| MqError::Delete("receipt handle is invalid or expired".into()))?;
        let entry = state.entries.remove(position);
        state.acked.push(entry.message_id);
        Ok(())
    }

    async fn send(&self, body: &str, group_id: Option<&str>) -> Result<String, MqError> {
        let message_id = Uuid::new_v4().to_string();
        self.push_to_group(message_id.clone(), body, group_id);

        let mut attributes = HashMap::new();
        if let Some(group) = group_id {
            attributes.insert(ATTR_MESSAGE_GROUP_ID.to_string(), group.to_string());
        }
        self.state.lock().unwrap().sent.push(QueueMessage {
            message_id: message_id.clone(),
            receipt_handle: String::new(),
            body: body.to_string(),
            attributes,
        });
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ReceiveOptions {
        ReceiveOptions::short_poll(10)
    }

    #[tokio::test]
    async fn test_in_flight_messages_are_hidden() {
        let queue = InMemoryQueue::new();
        queue.push("m1", "{}");

        assert_eq!(queue.receive(&opts()).await.unwrap().len(), 1);
        assert!(queue.receive(&opts()).await.unwrap().is_empty());
        assert_eq!(queue.in_flight_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_acks_and_removes() {
        let queue = InMemoryQueue::new();
        queue.push("m1", "{}");

        let received = queue.receive(&opts()).await.unwrap();
        queue.delete(&received[0].receipt_handle).await.unwrap();

        assert!(queue.is_empty());
        assert_eq!(queue.acked(), vec!["m1".to_string()]);
        assert!(queue.delete(&received[0].receipt_handle).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_message_is_redelivered_with_new_handle() {
        let queue = InMemoryQueue::new();
        queue.push("m1", "{}");

        let first = queue.receive(&opts()).await.unwrap().remove(0);
        queue.expire_in_flight();
        let second = queue.receive(&opts()).await.unwrap().remove(0);

        assert_eq!(second.message_id, "m1");
        assert_ne!(first.receipt_handle, second.receipt_handle);
        assert_eq!(second.receive_count(), Some(2));
        assert!(queue.delete(&first.receipt_handle).await.is_err());
    }

    #[tokio::test]
    async fn test_moves_to_dlq_after_max_receive_count() {
        let queue = InMemoryQueue::new().with_max_receive_count(3);
        queue.push("m1", "{}");

        for _ in 0..3 {
            assert_eq!(queue.receive(&opts()).await.unwrap().len(), 1);
            queue.expire_in_flight();
        }

        assert!(queue.receive(&opts()).await.unwrap().is_empty());
        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].message_id, "m1");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_batch_limit_and_groups() {
        let queue = InMemoryQueue::new();
        for i in 0..12 {
            queue.push_to_group(format!("m{i}"), "{}", Some("g"));
        }

        let batch = queue.receive(&opts()).await.unwrap();
        assert_eq!(batch.len(), 10);
        assert_eq!(batch[0].group_id(), Some("g"));
        assert_eq!(batch[0].message_id, "m0");
    }

    #[tokio::test]
    async fn test_injected_receive_failure() {
        let queue = InMemoryQueue::new();
        queue.fail_next_receives(1);

        assert!(queue.receive(&opts()).await.is_err());
        assert!(queue.receive(&opts()).await.is_ok());
        assert_eq!(queue.receive_calls(), 2);
    }
}
