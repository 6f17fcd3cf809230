use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::timestamp::rfc3339_millis;
use serde_json::{Map, Value};
use thiserror::Error;

/// A record the processor rejected. Stored on the error document; never
/// fails the message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ProcessingError(pub String);

impl ProcessingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Transform of one input record into one output record.
///
/// Implementations must not touch the network or the record store.
#[async_trait]
pub trait RecordProcessor: Send + Sync {
    async fn process(&self, record: &Value, index: u64) -> Result<Value, ProcessingError>;
}

/// Marks records as processed, optionally pausing to simulate work.
#[derive(Debug, Clone, Default)]
pub struct MergeProcessor {
    work_delay: Duration,
}

impl MergeProcessor {
    pub fn new(work_delay: Duration) -> Self {
        Self { work_delay }
    }

    pub fn work_delay(&self) -> Duration {
        self.work_delay
    }
}

#[async_trait]
impl RecordProcessor for MergeProcessor {
    async fn process(&self, record: &Value, index: u64) -> Result<Value, ProcessingError> {
        if !self.work_delay.is_zero() {
            tokio::time::sleep(self.work_delay).await;
        }
        Ok(merge_output(record, index, Utc::now()))
    }
}

/// Shallow-merge `record` with `processed`, `processingTimestamp` and
/// `recordIndex`. The three fields always win.
///
/// Non-object inputs spread like object spread in JavaScript: arrays by
/// position, strings by character, any other value contributes no keys.
pub fn merge_output(record: &Value, index: u64, at: DateTime<Utc>) -> Value {
    let mut output = match record {
        Value::Object(map) => map.clone(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item.clone()))
            .collect(),
        Value::String(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
            .collect(),
        _ => Map::new(),
    };

    output.insert("processed".into(), Value::Bool(true));
    output.insert(
        "processingTimestamp".into(),
        Value::String(rfc3339_millis(at)),
    );
    output.insert("recordIndex".into(), Value::from(index));
    Value::Object(output)
}
