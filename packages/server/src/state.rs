use std::sync::Arc;

use common::store::RecordStore;
use mq::{MessageQueue, ReceiveOptions};

use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn MessageQueue>,
    /// `None` when no database is configured.
    pub records: Option<Arc<dyn RecordStore>>,
    pub peek: ReceiveOptions,
}

impl AppState {
    pub fn records(&self) -> Result<&dyn RecordStore, AppError> {
        self.records.as_deref().ok_or(AppError::RecordsUnavailable)
    }
}
