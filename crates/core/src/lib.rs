pub mod hashing;
pub mod models;
pub mod pages;
pub mod retry;
pub mod traits;

pub use collector_errors::{CollectorError, CollectorResult};
pub use hashing::{canonical_json, content_digest};
pub use models::{AppointmentRecord, Dataset, JobStatus, PatientRecord, SYNC_NEVER};
pub use retry::{RetryExhausted, RetryPolicy};
pub use traits::{
    BrowserLauncher, BrowserSession, BrowserSessionExt, CacheService, ElementHandle, Key,
    SchedulerControl, UploadTransport,
};
