use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::record::Record;

/// Lifecycle status of a stream within one sync.
///
/// Every stream emits [`StreamStatus::Started`] when its partition generator is
/// submitted, [`StreamStatus::Running`] before its first record, and exactly one
/// terminal status: [`StreamStatus::Complete`] on a clean finish or
/// [`StreamStatus::Incomplete`] when the sync is aborted before all of its
/// partitions closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    Started,
    Running,
    Complete,
    Incomplete,
}

/// Severity of a side-channel log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A data record as it appears in the output sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    /// Name of the stream the record belongs to.
    pub stream: String,
    /// Opaque structured payload.
    pub data: Value,
    /// Milliseconds since the Unix epoch at which the record was forwarded.
    pub emitted_at: i64,
}

/// A stream lifecycle status as it appears in the output sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamStatusMessage {
    /// Name of the stream the status refers to.
    pub stream: String,
    /// The lifecycle status being reported.
    pub status: StreamStatus,
    /// Milliseconds since the Unix epoch at which the status was emitted.
    pub emitted_at: i64,
}

/// A side-channel log line as it appears in the output sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
}

/// One element of the ordered output sequence produced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceMessage {
    Record(RecordMessage),
    StreamStatus(StreamStatusMessage),
    Log(LogMessage),
}

impl SourceMessage {
    /// Converts a [`Record`] into an output message, stamping the emission time.
    pub fn record(record: Record) -> Self {
        SourceMessage::Record(RecordMessage {
            stream: record.stream_name,
            data: record.data,
            emitted_at: Utc::now().timestamp_millis(),
        })
    }

    /// Creates a stream status message, stamping the emission time.
    pub fn stream_status(stream: impl Into<String>, status: StreamStatus) -> Self {
        SourceMessage::StreamStatus(StreamStatusMessage {
            stream: stream.into(),
            status,
            emitted_at: Utc::now().timestamp_millis(),
        })
    }

    /// Creates a side-channel log message.
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        SourceMessage::Log(LogMessage {
            level,
            message: message.into(),
        })
    }

    /// Returns the status payload if this message is a stream status.
    pub fn as_stream_status(&self) -> Option<&StreamStatusMessage> {
        match self {
            SourceMessage::StreamStatus(status) => Some(status),
            _ => None,
        }
    }

    /// Returns the record payload if this message is a record.
    pub fn as_record(&self) -> Option<&RecordMessage> {
        match self {
            SourceMessage::Record(record) => Some(record),
            _ => None,
        }
    }
}
