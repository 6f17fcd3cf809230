pub mod config;
pub mod error;
pub mod models;
pub mod sqs;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{MqConfig, ReceiveOptions};
pub use error::MqError;
pub use models::{MessageQueue, QueueMessage, is_fifo_queue};
pub use sqs::{SqsQueue, init_mq};
