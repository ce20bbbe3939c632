use std::fmt;
use std::sync::Mutex;

use crate::types::SourceMessage;

/// A thread-safe buffer for side-channel messages.
///
/// Producer tasks and the orchestrator push messages here instead of writing to
/// the output directly; the orchestrator drains the buffer after each record and
/// partition-completion event so side-channel messages surface right after the
/// primary output that produced them.
///
/// The repository is injected as an explicit dependency wherever it is needed,
/// never reached through a process-global.
pub trait MessageRepository: Send + Sync + fmt::Debug {
    /// Buffers a message. Safe to call from any producer task.
    fn emit(&self, message: SourceMessage);

    /// Returns and clears everything buffered since the last drain, preserving
    /// insertion order. Called only by the orchestrator.
    fn drain(&self) -> Vec<SourceMessage>;
}

/// Default [`MessageRepository`] backed by a mutex-protected buffer.
#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    messages: Mutex<Vec<SourceMessage>>,
}

impl InMemoryMessageRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageRepository for InMemoryMessageRepository {
    fn emit(&self, message: SourceMessage) {
        let mut messages = match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.push(message);
    }

    fn drain(&self) -> Vec<SourceMessage> {
        let mut messages = match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *messages)
    }
}
