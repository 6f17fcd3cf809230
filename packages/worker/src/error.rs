use common::storage::StorageError;
use common::store::RecordStoreError;
use thiserror::Error;

/// Reasons the worker refuses to start.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

/// Why a message could not be handled. Any of these leaves the message
/// unacknowledged so the queue redelivers it and eventually dead-letters it.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl HandlerError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::NotFound(_) => "not_found",
            Self::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

impl From<StorageError> for HandlerError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(key) => Self::NotFound(key),
            StorageError::MalformedPayload { .. } => Self::MalformedPayload(e.to_string()),
            StorageError::Transient(msg) => Self::Transient(msg),
            StorageError::Config(msg) => Self::StorageUnavailable(msg),
        }
    }
}

impl From<RecordStoreError> for HandlerError {
    fn from(e: RecordStoreError) -> Self {
        Self::Transient(e.to_string())
    }
}
