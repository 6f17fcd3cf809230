use std::time::Duration;

/// Connection settings for the queue client.
#[derive(Debug, Clone)]
pub struct MqConfig {
    pub queue_url: String,
    pub region: String,
    /// Custom endpoint (LocalStack, ElasticMQ).
    pub endpoint_url: Option<String>,
}

/// Parameters of one receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// 1..=10.
    pub max_messages: i32,
    /// Long-poll wait; zero means a short poll.
    pub wait_time: Duration,
    /// Per-receive visibility override. `None` keeps the queue's setting.
    pub visibility_timeout: Option<Duration>,
}

impl ReceiveOptions {
    pub const MAX_BATCH: i32 = 10;

    /// Long poll used by the ingestion loop: 10 messages, 20 seconds.
    pub fn long_poll() -> Self {
        Self {
            max_messages: Self::MAX_BATCH,
            wait_time: Duration::from_secs(20),
            visibility_timeout: None,
        }
    }

    /// Non-blocking peek.
    pub fn short_poll(max_messages: i32) -> Self {
        Self {
            max_messages,
            wait_time: Duration::ZERO,
            visibility_timeout: None,
        }
    }

    /// Clamp to what the queue service accepts.
    pub fn clamped(self) -> Self {
        Self {
            max_messages: self.max_messages.clamp(1, Self::MAX_BATCH),
            wait_time: self.wait_time.min(Duration::from_secs(20)),
            visibility_timeout: self.visibility_timeout,
        }
    }
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self::long_poll()
    }
}
