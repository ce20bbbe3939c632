use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

use crate::error::CdkResult;
use crate::source::partition::Partition;

/// Whether a stream can be synced, with the reason when it cannot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAvailability {
    Available,
    Unavailable { reason: String },
}

impl StreamAvailability {
    /// Marks a stream as unavailable for the given reason.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StreamAvailability::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, StreamAvailability::Available)
    }
}

/// A named, independently-synced data source exposing zero or more partitions.
///
/// Implementations own everything request-shaped: which partitions exist, how
/// their records are fetched, and any retry policy for individual requests. The
/// extraction core consumes this trait to run many streams concurrently and
/// merge their output into one ordered message sequence.
///
/// Partition generation may be lazy and network-bound: the stream returned by
/// [`SourceStream::generate_partitions`] is polled from a worker task, not from
/// the orchestrator.
#[async_trait]
pub trait SourceStream: Send + Sync + fmt::Debug {
    /// Name of the stream, unique within one sync.
    fn name(&self) -> &str;

    /// Checks whether the stream can currently be synced.
    ///
    /// Unavailable streams are excluded from the sync with a warning; they do not
    /// fail the pipeline.
    async fn check_availability(&self) -> CdkResult<StreamAvailability>;

    /// Returns the lazy, finite sequence of partitions to read for this sync.
    fn generate_partitions(&self) -> BoxStream<'_, CdkResult<Box<dyn Partition>>>;
}
