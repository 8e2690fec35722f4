pub mod scheduler;

pub use scheduler::{JobAction, JobScheduler};
