use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single data record produced by reading one partition.
///
/// The payload is opaque to the extraction core: records are moved from the
/// partition reader to the output without inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Name of the stream this record belongs to.
    pub stream_name: String,
    /// Opaque structured payload.
    pub data: Value,
}

impl Record {
    /// Creates a new record for the given stream.
    pub fn new(stream_name: impl Into<String>, data: Value) -> Self {
        Self {
            stream_name: stream_name.into(),
            data,
        }
    }
}
