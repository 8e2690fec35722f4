pub mod browser;
pub mod cache;
pub mod scheduler;
pub mod transport;

pub use browser::*;
pub use cache::*;
pub use scheduler::*;
pub use transport::*;
