use mq::QueueMessage;
use serde::Serialize;
use serde_json::Value;

/// Message group used for admin enqueues on FIFO queues.
pub const ADMIN_MESSAGE_GROUP: &str = "admin-ingest";

#[derive(Serialize, utoipa::ToSchema)]
pub struct IngestResponse {
    #[schema(example = true)]
    pub success: bool,
    /// Id assigned by the queue.
    #[schema(example = "5fea7756-0ea4-451a-a703-a558b933e274")]
    pub message_id: String,
    #[schema(example = "2025-09-01T08:00:00.000Z")]
    pub timestamp: String,
}

/// A received message, still in flight until deleted or expired.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PeekedMessage {
    pub message_id: String,
    /// The body parsed as JSON; a body that is not JSON is returned as a string.
    pub body: Value,
    /// Pass to `DELETE /messages/{receipt_handle}` to acknowledge.
    pub receipt_handle: String,
}

impl From<QueueMessage> for PeekedMessage {
    fn from(m: QueueMessage) -> Self {
        let body = serde_json::from_str(&m.body).unwrap_or(Value::String(m.body));
        Self {
            message_id: m.message_id,
            body,
            receipt_handle: m.receipt_handle,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageListResponse {
    #[schema(example = 1)]
    pub count: usize,
    pub messages: Vec<PeekedMessage>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteMessageResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Message deleted successfully")]
    pub message: &'static str,
}
