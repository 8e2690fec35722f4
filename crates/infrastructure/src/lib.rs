pub mod browser;
pub mod cache;
pub mod metrics;
pub mod transport;

pub use browser::{WebDriverLauncher, WebDriverSession};
pub use cache::{create_cache, CacheStats, InMemoryCache, RedisCacheManager};
pub use metrics::MetricsCollector;
pub use transport::HttpUploadTransport;
