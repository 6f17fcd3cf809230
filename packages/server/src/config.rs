use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use common::config::{
    ConfigSummary, DatabaseAppConfig, QueueAppConfig, default_environment, with_deployment_env,
};
use mq::{MqConfig, ReceiveOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Wait time of the `GET /messages` peek in seconds. Default: 0 (short poll).
    #[serde(default)]
    pub peek_wait_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            peek_wait_secs: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueAppConfig,
    /// Optional here: without it the `/records` routes answer 503.
    #[serde(default)]
    pub database: DatabaseAppConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("INGEST_CONFIG").unwrap_or_else(|_| "config/server".to_string());

        let builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .add_source(File::with_name(&config_path).required(false))
            // e.g. INGEST__SERVER__PORT
            .add_source(Environment::with_prefix("INGEST").separator("__"));

        with_deployment_env(builder)?.build()?.try_deserialize()
    }

    pub fn database_url(&self) -> Option<&str> {
        Some(self.database.url.as_str()).filter(|u| !u.trim().is_empty())
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            environment: self.environment.clone(),
            region: self.queue.region.clone(),
            queue_url: Some(self.queue.url.clone()).filter(|u| !u.trim().is_empty()),
            bucket: None,
            database_configured: self.database_url().is_some(),
        }
    }

    pub fn mq_config(&self) -> MqConfig {
        MqConfig {
            queue_url: self.queue.url.clone(),
            region: self.queue.region.clone(),
            endpoint_url: self.queue.endpoint_url.clone(),
        }
    }

    /// Receive parameters for the admin peek: a full batch, never blocking
    /// longer than `peek_wait_secs`.
    pub fn peek_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            wait_time: Duration::from_secs(self.server.peek_wait_secs),
            ..ReceiveOptions::short_poll(ReceiveOptions::MAX_BATCH)
        }
        .clamped()
    }
}
