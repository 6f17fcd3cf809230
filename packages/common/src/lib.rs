pub mod config;
pub mod ingestion;
pub mod record_status;
pub mod retry;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod timestamp;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use record_status::RecordStatus;
