pub mod envelope;
pub mod processor;
pub mod worker;

pub use envelope::{DIRECT_SOURCE_KEY, Dispatch, LEGACY_SOURCE_KEY, classify};
pub use processor::{MergeProcessor, ProcessingError, RecordProcessor, merge_output};
pub use worker::{BatchReport, IngestionWorker, StopHandle, WorkerSettings};
