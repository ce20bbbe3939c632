//! Producer tasks feeding the shared partition queue.
//!
//! Both task types follow the same contract: enqueue every item the underlying
//! sequence yields, then exactly one completion sentinel. When the sequence
//! fails, the error is enqueued as a value and the sentinel is withheld, which
//! keeps the stream (or partition) unfinished in the ledger.
//!
//! A closed queue means the orchestrator is already unwinding; tasks then stop
//! silently since their output would be ignored anyway.

use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::source::partition::PartitionHandle;
use crate::source::queue::{
    PartitionCompleted, PartitionGenerationCompleted, QueueItem, QueueTx,
};
use crate::source::stream::SourceStream;

/// Drives one stream's partition sequence and feeds the shared queue.
///
/// Runs as one worker pool task per stream.
#[derive(Debug, Clone)]
pub struct PartitionGenerator {
    queue: QueueTx,
}

impl PartitionGenerator {
    pub fn new(queue: QueueTx) -> Self {
        Self { queue }
    }

    /// Pulls every partition the stream generates, enqueueing each one followed
    /// by a single generation-complete sentinel.
    pub async fn generate_partitions(self, stream: Arc<dyn SourceStream>) {
        let stream_name = stream.name().to_string();
        debug!(stream = %stream_name, "generating partitions");

        let mut partitions = stream.generate_partitions();
        let mut generated = 0usize;
        while let Some(partition) = partitions.next().await {
            match partition {
                Ok(partition) => {
                    generated += 1;
                    let handle = PartitionHandle::new(partition);
                    if self.queue.send(QueueItem::Partition(handle)).is_err() {
                        debug!(stream = %stream_name, "partition queue closed, stopping generation");
                        return;
                    }
                }
                Err(err) => {
                    debug!(stream = %stream_name, error = %err, "partition generation failed");
                    let _ = self.queue.send(QueueItem::Error(err));
                    return;
                }
            }
        }

        trace!(stream = %stream_name, partitions = generated, "partition generation exhausted");
        let _ = self
            .queue
            .send(QueueItem::GenerationCompleted(PartitionGenerationCompleted {
                stream_name,
            }));
    }
}

/// Reads one partition to exhaustion and feeds the shared queue.
///
/// Runs as one worker pool task per partition.
#[derive(Debug, Clone)]
pub struct PartitionReader {
    queue: QueueTx,
}

impl PartitionReader {
    pub fn new(queue: QueueTx) -> Self {
        Self { queue }
    }

    /// Pulls every record from the partition, enqueueing each one followed by a
    /// single partition-complete sentinel referencing the partition.
    pub async fn process_partition(self, partition: PartitionHandle) {
        trace!(stream = %partition.stream_name(), "reading partition");

        {
            let mut records = partition.records();
            while let Some(record) = records.next().await {
                match record {
                    Ok(record) => {
                        if self.queue.send(QueueItem::Record(record)).is_err() {
                            debug!(stream = %partition.stream_name(), "partition queue closed, stopping read");
                            return;
                        }
                    }
                    Err(err) => {
                        debug!(stream = %partition.stream_name(), error = %err, "partition read failed");
                        let _ = self.queue.send(QueueItem::Error(err));
                        return;
                    }
                }
            }
        }

        let _ = self
            .queue
            .send(QueueItem::PartitionCompleted(PartitionCompleted { partition }));
    }
}
