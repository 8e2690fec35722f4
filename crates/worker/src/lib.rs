pub mod clinic;
pub mod tasks;
pub mod uploader;

pub use clinic::ClinicClient;
pub use tasks::{register_jobs, seed_sync_markers, SyncTasks};
pub use uploader::{UploadOutcome, Uploader};
