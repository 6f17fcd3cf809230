use std::fmt;

use crate::retry::Transient;

/// Errors that can occur while reading objects from storage.
#[derive(Debug)]
pub enum StorageError {
    /// The requested object does not exist.
    NotFound(String),
    /// The object exists but its body is empty, not UTF-8, or not JSON.
    MalformedPayload { key: String, reason: String },
    /// Network or service failure. Repeating the call may succeed.
    Transient(String),
    /// No bucket configured, bad region or missing credentials.
    Config(String),
}

impl StorageError {
    pub fn malformed(key: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Transient for StorageError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "object not found: {key}"),
            Self::MalformedPayload { key, reason } => {
                write!(f, "malformed object {key}: {reason}")
            }
            Self::Transient(msg) => write!(f, "storage unavailable: {msg}"),
            Self::Config(msg) => write!(f, "storage misconfigured: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}
