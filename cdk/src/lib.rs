pub mod concurrency;
pub mod config;
pub mod error;
mod macros;
pub mod pipeline;
pub mod sink;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;
