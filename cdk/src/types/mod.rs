//! Core data types moved through the extraction pipeline.

mod message;
mod record;

pub use message::{LogLevel, LogMessage, RecordMessage, SourceMessage, StreamStatus, StreamStatusMessage};
pub use record::Record;

/// Unique identifier of a pipeline.
pub type PipelineId = u64;
