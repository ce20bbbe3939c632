use serde_json::Value;
use std::fmt;

use crate::types::{LogLevel, SourceMessage};

/// Decides whether newly generated partitions surface their slice as a log message.
///
/// Slice messages go through the message repository so they interleave correctly
/// with the primary output.
pub trait SliceLogger: Send + Sync + fmt::Debug {
    /// Whether slice log messages should be produced at all.
    fn should_log_slice_message(&self) -> bool;

    /// Builds the log message for one slice.
    fn create_slice_log_message(&self, slice: &Value) -> SourceMessage {
        SourceMessage::log(LogLevel::Info, format!("slice:{slice}"))
    }
}

/// Logs slices only when debug-level logging is enabled for this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugSliceLogger;

impl SliceLogger for DebugSliceLogger {
    fn should_log_slice_message(&self) -> bool {
        tracing::enabled!(tracing::Level::DEBUG)
    }
}

/// Logs every slice unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysLogSliceLogger;

impl SliceLogger for AlwaysLogSliceLogger {
    fn should_log_slice_message(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slice_message_format() {
        let message = AlwaysLogSliceLogger.create_slice_log_message(&json!({"start": 0, "end": 10}));
        assert_eq!(
            message,
            SourceMessage::log(LogLevel::Info, r#"slice:{"end":10,"start":0}"#)
        );
    }
}
