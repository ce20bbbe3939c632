//! The shared partition queue connecting producer tasks to the orchestrator.
//!
//! Every generator and reader task owns a sender; the orchestrator worker owns
//! the single receiver. The channel is unbounded: memory growth is bounded
//! upstream by the worker pool's admission control, not by the channel itself.

use tokio::sync::mpsc;

use crate::error::CdkError;
use crate::source::partition::PartitionHandle;
use crate::types::Record;

/// Sentinel signalling that a stream's generator task finished producing partitions.
///
/// Created exactly once per stream, when the partition sequence is exhausted. It is
/// withheld when generation fails, so the stream is never reported complete.
#[derive(Debug, Clone)]
pub struct PartitionGenerationCompleted {
    /// Name of the stream whose generator finished.
    pub stream_name: String,
}

/// Sentinel signalling that a partition's reader task finished producing records.
///
/// Created exactly once per partition, when the record sequence is exhausted. It is
/// withheld when reading fails, so the partition is never marked closed.
#[derive(Debug, Clone)]
pub struct PartitionCompleted {
    /// The partition whose reader finished.
    pub partition: PartitionHandle,
}

/// One item on the shared queue.
///
/// The closed set of message kinds flowing through the channel; the orchestrator
/// dispatches on the variant. Once an [`QueueItem::Error`] is dequeued, normal
/// processing stops and the error propagates to the caller.
#[derive(Debug)]
pub enum QueueItem {
    /// A freshly generated partition that still needs a reader task.
    Partition(PartitionHandle),
    /// A record read from some partition.
    Record(Record),
    /// A stream finished generating partitions.
    GenerationCompleted(PartitionGenerationCompleted),
    /// A partition finished producing records.
    PartitionCompleted(PartitionCompleted),
    /// A producer task failed; carries the error as a value.
    Error(CdkError),
}

/// Sender half of the partition queue, cloned into every producer task.
pub type QueueTx = mpsc::UnboundedSender<QueueItem>;

/// Receiver half of the partition queue, owned by the orchestrator worker.
pub type QueueRx = mpsc::UnboundedReceiver<QueueItem>;

/// Creates the shared partition queue.
pub fn create_partition_queue() -> (QueueTx, QueueRx) {
    mpsc::unbounded_channel()
}
