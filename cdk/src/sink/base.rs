use std::future::Future;

use crate::error::CdkResult;
use crate::types::SourceMessage;

/// Trait for consumers of the ordered output message sequence.
///
/// [`MessageSink`] implementations define where the merged output of a sync goes:
/// stdout framing, a buffer, a socket. The orchestrator calls [`MessageSink::emit`]
/// exactly in emission order, from a single task, so implementations never observe
/// concurrent calls for one pipeline.
///
/// A sink error is fatal for the sync: the orchestrator stops and tears down all
/// in-flight work.
pub trait MessageSink {
    /// Returns the name of the sink.
    fn name() -> &'static str;

    /// Consumes one output message.
    fn emit(&self, message: SourceMessage) -> impl Future<Output = CdkResult<()>> + Send;
}
