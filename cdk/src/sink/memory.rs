use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::CdkResult;
use crate::sink::base::MessageSink;
use crate::types::{RecordMessage, SourceMessage, StreamStatus, StreamStatusMessage};

#[derive(Debug)]
struct Inner {
    messages: Vec<SourceMessage>,
}

/// In-memory sink for testing and development purposes.
///
/// [`MemorySink`] stores the full output sequence in memory so tests can assert
/// on message ordering and content after a sync finishes. All data is lost when
/// the process terminates.
#[derive(Debug, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySink {
    /// Creates a new empty memory sink.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                messages: Vec::new(),
            })),
        }
    }

    /// Returns a copy of every message emitted so far, in emission order.
    pub async fn messages(&self) -> Vec<SourceMessage> {
        let inner = self.inner.lock().await;
        inner.messages.clone()
    }

    /// Returns a copy of every record message emitted so far, in emission order.
    pub async fn records(&self) -> Vec<RecordMessage> {
        let inner = self.inner.lock().await;
        inner
            .messages
            .iter()
            .filter_map(|message| message.as_record().cloned())
            .collect()
    }

    /// Returns the statuses emitted for one stream, in emission order.
    pub async fn stream_statuses(&self, stream: &str) -> Vec<StreamStatus> {
        let inner = self.inner.lock().await;
        inner
            .messages
            .iter()
            .filter_map(|message| message.as_stream_status())
            .filter(|status| status.stream == stream)
            .map(|status: &StreamStatusMessage| status.status)
            .collect()
    }

    /// Clears all stored messages.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.messages.clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSink for MemorySink {
    fn name() -> &'static str {
        "memory"
    }

    async fn emit(&self, message: SourceMessage) -> CdkResult<()> {
        let mut inner = self.inner.lock().await;

        debug!("storing message: {:?}", message);
        inner.messages.push(message);

        Ok(())
    }
}
