use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt document {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

#[cfg(feature = "sea-orm")]
impl From<sea_orm::DbErr> for RecordStoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}
