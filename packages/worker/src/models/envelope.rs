use serde_json::Value;

use crate::error::HandlerError;

/// Source key recorded for `direct_data` messages.
pub const DIRECT_SOURCE_KEY: &str = "direct_message";
/// Source key recorded for messages without a known `type`.
pub const LEGACY_SOURCE_KEY: &str = "legacy_message";

const TYPE_S3_FILE: &str = "s3_file";
const TYPE_DIRECT_DATA: &str = "direct_data";

/// Where a message body sends its records.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Records live in a JSON file in object storage.
    S3File {
        key: String,
        metadata: Option<Value>,
    },
    /// One inline record.
    DirectData { data: Value },
    /// No recognised `type`: the whole body is the record.
    Legacy { record: Value },
}

impl Dispatch {
    pub fn source_key(&self) -> &str {
        match self {
            Self::S3File { key, .. } => key,
            Self::DirectData { .. } => DIRECT_SOURCE_KEY,
            Self::Legacy { .. } => LEGACY_SOURCE_KEY,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::S3File { .. } => TYPE_S3_FILE,
            Self::DirectData { .. } => TYPE_DIRECT_DATA,
            Self::Legacy { .. } => "legacy",
        }
    }
}

/// Parse a message body and decide which path handles it.
///
/// An `s3_file` message must carry a non-empty string `key` (older producers
/// send `s3Key`; `key` wins when both are present).
pub fn classify(body: &str) -> Result<Dispatch, HandlerError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| HandlerError::MalformedPayload(format!("body is not JSON: {e}")))?;

    let message_type = value.get("type").and_then(Value::as_str);

    match message_type {
        Some(TYPE_S3_FILE) => {
            let key = ["key", "s3Key"]
                .iter()
                .find_map(|field| value.get(*field).and_then(Value::as_str))
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    HandlerError::MalformedPayload("s3_file message without a key".into())
                })?
                .to_string();
            Ok(Dispatch::S3File {
                key,
                metadata: value.get("metadata").cloned(),
            })
        }
        Some(TYPE_DIRECT_DATA) => Ok(Dispatch::DirectData {
            data: value.get("data").cloned().unwrap_or(Value::Null),
        }),
        _ => Ok(Dispatch::Legacy { record: value }),
    }
}
