use config::builder::{ConfigBuilder, DefaultState};
use config::ConfigError;
use serde::Deserialize;

pub const DEFAULT_AWS_REGION: &str = "eu-west-1";
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Queue connection and long-poll settings.
#[derive(Debug, Deserialize, Clone)]
pub struct QueueAppConfig {
    /// Queue URL. Required; usually supplied through `QUEUE_URL`.
    #[serde(default)]
    pub url: String,
    /// AWS region. Default: "eu-west-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint (LocalStack, ElasticMQ). Default: none.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Messages per receive, 1..=10. Default: 10.
    #[serde(default = "default_max_messages")]
    pub max_messages: i32,
    /// Long-poll wait in seconds, 0..=20. Default: 20.
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: u64,
    /// Visibility window configured on the queue, in seconds. Default: 250.
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,
    /// Send `visibility_timeout_secs` with every receive instead of relying on
    /// the queue attribute. Default: false.
    #[serde(default)]
    pub override_visibility: bool,
}

fn default_region() -> String {
    DEFAULT_AWS_REGION.into()
}
fn default_max_messages() -> i32 {
    10
}
fn default_wait_time_secs() -> u64 {
    20
}
fn default_visibility_timeout_secs() -> u64 {
    250
}

impl Default for QueueAppConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            region: default_region(),
            endpoint_url: None,
            max_messages: default_max_messages(),
            wait_time_secs: default_wait_time_secs(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            override_visibility: false,
        }
    }
}

/// Object storage settings.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Bucket holding the JSON files referenced by `s3_file` messages.
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Use path-style addressing (required by most S3 emulators). Default: false.
    #[serde(default)]
    pub path_style: bool,
    /// Attempts per GET/HEAD before a transient failure propagates. Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u8 {
    3
}
fn default_base_delay_ms() -> u64 {
    200
}
fn default_max_delay_ms() -> u64 {
    2000
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: default_region(),
            endpoint_url: None,
            path_style: false,
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl StorageAppConfig {
    /// The configured bucket, ignoring blank values.
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket.as_deref().filter(|b| !b.trim().is_empty())
    }
}

/// Document store settings.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseAppConfig {
    /// Connection string. Usually supplied through `DATABASE_URL`, or
    /// `MONGODB_URI` in older deployment environments.
    #[serde(default)]
    pub url: String,
    /// Connection pool size. Default: 10.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseAppConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

pub fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.into()
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Apply the flat deployment variables (`QUEUE_URL`, `AWS_REGION`, ...) on top
/// of the structured sources.
pub fn with_deployment_env(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    apply_deployment_vars(builder, env_var)
}

fn apply_deployment_vars(
    builder: ConfigBuilder<DefaultState>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let region = lookup("AWS_REGION");
    builder
        .set_override_option("queue.url", lookup("QUEUE_URL"))?
        .set_override_option("queue.region", region.clone())?
        .set_override_option("storage.region", region)?
        .set_override_option("storage.bucket", lookup("S3_BUCKET_NAME"))?
        .set_override_option(
            "database.url",
            lookup("DATABASE_URL").or_else(|| lookup("MONGODB_URI")),
        )?
        .set_override_option(
            "environment",
            lookup("NODE_ENV").or_else(|| lookup("APP_ENV")),
        )
}

/// Which deployment settings are present. Never carries secret values.
#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub environment: String,
    pub region: String,
    pub queue_url: Option<String>,
    pub bucket: Option<String>,
    pub database_configured: bool,
}

impl ConfigSummary {
    pub fn log(&self) {
        tracing::info!(
            environment = %self.environment,
            region = %self.region,
            queue_url = self.queue_url.as_deref().unwrap_or("not set"),
            s3_bucket = self.bucket.as_deref().unwrap_or("not set"),
            database = if self.database_configured { "configured" } else { "not set" },
            "Configuration summary"
        );
    }
}
