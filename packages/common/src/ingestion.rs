use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timestamp::now_rfc3339_millis;

/// Source tag stamped on messages enqueued through the admin surface.
pub const ADMIN_SOURCE: &str = "admin-api";

/// Envelope written by the admin `POST /ingest` route.
///
/// It carries no `type` discriminator, so the worker routes it down the
/// legacy path and stores the whole envelope as one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestionMessage {
    pub id: String,
    /// RFC-3339 enqueue time.
    pub timestamp: String,
    pub data: serde_json::Value,
    pub source: String,
}

impl IngestionMessage {
    pub fn new(data: serde_json::Value, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            timestamp: now_rfc3339_millis(),
            data,
            source: source.into(),
        }
    }
}
