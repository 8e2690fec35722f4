pub mod dataset;
pub mod job_status;
pub mod record;

pub use dataset::*;
pub use job_status::*;
pub use record::*;
