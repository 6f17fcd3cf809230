use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use common::config::{
    ConfigSummary, DatabaseAppConfig, QueueAppConfig, StorageAppConfig, default_environment,
    with_deployment_env,
};
use common::retry::RetryPolicy;
use mq::{MqConfig, ReceiveOptions};

use crate::error::{Result, WorkerError};

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Records of one file processed at the same time. Default: 1 (sequential).
    #[serde(default = "default_record_concurrency")]
    pub record_concurrency: usize,
    /// Simulated work per record in milliseconds. Default: 0.
    #[serde(default)]
    pub work_delay_ms: u64,
    /// Pause after an empty receive. Default: 1000.
    #[serde(default = "default_empty_poll_delay_ms")]
    pub empty_poll_delay_ms: u64,
    /// Pause after a failed receive. Default: 5000.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Handle messages sharing a message group one after another. Default: false.
    #[serde(default)]
    pub serialize_message_groups: bool,
    /// Prune outcome documents older than this many days. Default: disabled.
    #[serde(default)]
    pub retention_days: Option<u32>,
    /// How often the pruning task runs. Default: 3600.
    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_record_concurrency() -> usize {
    1
}
fn default_empty_poll_delay_ms() -> u64 {
    1000
}
fn default_error_backoff_ms() -> u64 {
    5000
}
fn default_retention_interval_secs() -> u64 {
    3600
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            record_concurrency: default_record_concurrency(),
            work_delay_ms: 0,
            empty_poll_delay_ms: default_empty_poll_delay_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            serialize_message_groups: false,
            retention_days: None,
            retention_interval_secs: default_retention_interval_secs(),
        }
    }
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerAppConfig {
    /// Deployment environment hint (`NODE_ENV`/`APP_ENV`). Default: "development".
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub queue: QueueAppConfig,
    #[serde(default)]
    pub storage: StorageAppConfig,
    #[serde(default)]
    pub database: DatabaseAppConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("INGEST_CONFIG").unwrap_or_else(|_| "config/worker".to_string());

        let builder = Config::builder()
            .set_default("worker.id", "worker-1")?
            .set_default("worker.record_concurrency", 1_i64)?
            .set_default("worker.work_delay_ms", 0_i64)?
            .set_default("queue.max_messages", 10_i64)?
            .set_default("queue.wait_time_secs", 20_i64)?
            .set_default("queue.visibility_timeout_secs", 250_i64)?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("INGEST").separator("__"));

        Ok(with_deployment_env(builder)?.build()?.try_deserialize()?)
    }

    /// Refuse to start without a queue or a document store.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.queue.url.trim().is_empty() {
            missing.push("QUEUE_URL");
        }
        if self.database.url.trim().is_empty() {
            missing.push("DATABASE_URL (or MONGODB_URI)");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkerError::MissingConfig(missing.join(", ")))
        }
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            environment: self.environment.clone(),
            region: self.queue.region.clone(),
            queue_url: Some(self.queue.url.clone()).filter(|u| !u.trim().is_empty()),
            bucket: self.storage.bucket_name().map(str::to_string),
            database_configured: !self.database.url.trim().is_empty(),
        }
    }

    pub fn mq_config(&self) -> MqConfig {
        MqConfig {
            queue_url: self.queue.url.clone(),
            region: self.queue.region.clone(),
            endpoint_url: self.queue.endpoint_url.clone(),
        }
    }

    pub fn receive_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            max_messages: self.queue.max_messages,
            wait_time: Duration::from_secs(self.queue.wait_time_secs),
            visibility_timeout: self
                .queue
                .override_visibility
                .then(|| self.visibility_timeout()),
        }
        .clamped()
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.queue.visibility_timeout_secs)
    }

    pub fn storage_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.storage.max_attempts,
            self.storage.base_delay_ms,
            self.storage.max_delay_ms,
        )
    }
}
