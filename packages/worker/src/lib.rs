pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod retention;

pub use config::{WorkerAppConfig, WorkerConfig};
pub use error::{HandlerError, Result, WorkerError};
pub use handlers::{HandlerSettings, MessageHandler, MessageReport};
pub use models::{BatchReport, IngestionWorker, MergeProcessor, StopHandle, WorkerSettings};
