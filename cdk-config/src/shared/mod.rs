//! Shared configuration types for connector pipelines.

mod pipeline;
mod workers;

use thiserror::Error;

pub use pipeline::PipelineConfig;
pub use workers::WorkersConfig;

/// Errors raised when validating configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("workers.max_workers must be greater than 0")]
    MaxWorkersZero,
    #[error("workers.max_outstanding_tasks must be greater than 0")]
    MaxOutstandingTasksZero,
    #[error("max_concurrent_streams must be greater than 0")]
    MaxConcurrentStreamsZero,
    #[error("invalid value for field `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
}
