use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::ReceiveOptions;
use crate::error::MqError;

pub const ATTR_MESSAGE_GROUP_ID: &str = "MessageGroupId";
pub const ATTR_RECEIVE_COUNT: &str = "ApproximateReceiveCount";

/// A message as delivered by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    /// Ack token, valid only within the current visibility window.
    pub receipt_handle: String,
    pub body: String,
    /// System and string message attributes.
    pub attributes: HashMap<String, String>,
}

impl QueueMessage {
    pub fn group_id(&self) -> Option<&str> {
        self.attributes
            .get(ATTR_MESSAGE_GROUP_ID)
            .map(String::as_str)
    }

    pub fn receive_count(&self) -> Option<u32> {
        self.attributes
            .get(ATTR_RECEIVE_COUNT)
            .and_then(|v| v.parse().ok())
    }
}

/// FIFO queues are recognised by their `.fifo` suffix.
pub fn is_fifo_queue(queue_url: &str) -> bool {
    queue_url.ends_with(".fifo")
}

/// Minimal queue operations shared by the worker and the admin surface.
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    fn queue_url(&self) -> &str;

    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, MqError>;

    /// Acknowledge (delete) a received message.
    async fn delete(&self, receipt_handle: &str) -> Result<(), MqError>;

    /// Enqueue a body. Returns the queue-assigned message id.
    async fn send(&self, body: &str, group_id: Option<&str>) -> Result<String, MqError>;
}
