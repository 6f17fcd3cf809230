use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use tracing::{debug, warn};

use crate::config::{MqConfig, ReceiveOptions};
use crate::error::MqError;
use crate::models::{MessageQueue, QueueMessage};

/// Amazon SQS (or a compatible emulator) behind [`MessageQueue`].
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    fn convert(message: &Message) -> Option<QueueMessage> {
        let receipt_handle = message.receipt_handle()?.to_string();
        let message_id = message.message_id().unwrap_or_default().to_string();

        let mut attributes = HashMap::new();
        if let Some(attrs) = message.attributes() {
            for (key, value) in attrs {
                attributes.insert(key.as_str().to_string(), value.clone());
            }
        }
        if let Some(msg_attrs) = message.message_attributes() {
            for (key, attr) in msg_attrs {
                if let Some(value) = attr.string_value() {
                    attributes.insert(key.clone(), value.to_string());
                }
            }
        }

        Some(QueueMessage {
            message_id,
            receipt_handle,
            body: message.body().unwrap_or_default().to_string(),
            attributes,
        })
    }
}

/// Build the SQS client from the default credential chain.
pub async fn init_mq(config: &MqConfig) -> Result<SqsQueue, MqError> {
    if config.queue_url.trim().is_empty() {
        return Err(MqError::Config("queue URL is empty".into()));
    }

    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;

    let mut builder = aws_sdk_sqs::config::Builder::from(&shared);
    if let Some(ref endpoint) = config.endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }

    Ok(SqsQueue::new(
        Client::from_conf(builder.build()),
        config.queue_url.clone(),
    ))
}

#[async_trait]
impl MessageQueue for SqsQueue {
    fn queue_url(&self) -> &str {
        &self.queue_url
    }

    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, MqError> {
        let options = options.clamped();
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(options.max_messages)
            .wait_time_seconds(options.wait_time.as_secs() as i32)
            .set_visibility_timeout(options.visibility_timeout.map(|d| d.as_secs() as i32))
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| MqError::Receive(DisplayErrorContext(&e).to_string()))?;

        let mut messages = Vec::new();
        for message in output.messages() {
            match Self::convert(message) {
                Some(converted) => messages.push(converted),
                None => warn!(
                    message_id = message.message_id().unwrap_or("unknown"),
                    "Skipping message without receipt handle"
                ),
            }
        }

        debug!(count = messages.len(), "Received messages");
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), MqError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| MqError::Delete(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn send(&self, body: &str, group_id: Option<&str>) -> Result<String, MqError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .set_message_group_id(group_id.map(str::to_string))
            .send()
            .await
            .map_err(|e| MqError::Send(DisplayErrorContext(&e).to_string()))?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }
}
