pub mod api_observability;
pub mod app_config;
pub mod cache;
pub mod clinic;
pub mod scheduler;
pub mod uploader;

pub use api_observability::*;
pub use app_config::*;
pub use cache::*;
pub use clinic::*;
pub use scheduler::*;
pub use uploader::*;
