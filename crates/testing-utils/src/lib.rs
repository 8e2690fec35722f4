//! # Collector Testing Utils
//!
//! Shared testing utilities for the collector workspace: a scripted clinic
//! browser, recording upload transport, in-memory cache doubles and test data
//! builders.
//!
//! ```toml
//! [dev-dependencies]
//! collector-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

// Re-export commonly used items
pub use builders::*;
pub use helpers::*;
pub use mocks::*;
