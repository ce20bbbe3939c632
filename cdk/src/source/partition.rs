use futures::stream::BoxStream;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::CdkResult;
use crate::types::Record;

/// A unit of work belonging to one stream, such as a page range or a date slice.
///
/// Implementations decide what a partition covers and how its records are fetched;
/// the extraction core only moves partitions through its pipeline. Record fetching
/// may be lazy: network calls are expected to happen as the returned stream is
/// polled.
pub trait Partition: Send + Sync + fmt::Debug {
    /// Name of the stream this partition belongs to.
    fn stream_name(&self) -> &str;

    /// JSON representation of the slice this partition covers, used for slice
    /// logging. Returns `None` when the partition has no meaningful slice
    /// representation.
    fn to_slice(&self) -> Option<Value> {
        None
    }

    /// Returns the lazily-produced sequence of records contained in this partition.
    fn records(&self) -> BoxStream<'_, CdkResult<Record>>;
}

struct PartitionShared {
    partition: Box<dyn Partition>,
    closed: AtomicBool,
}

/// A [`Partition`] with stable identity and a closure flag.
///
/// Handles are created when a partition is first enqueued and travel through the
/// queue, the completion ledger and the partition-complete sentinel. Identity is
/// the allocation itself: two handles compare equal only when they were cloned
/// from the same original, which makes the handle usable as a set key.
///
/// A handle is closed by the orchestrator once the partition's reader task has
/// finished emitting records, never before.
#[derive(Clone)]
pub struct PartitionHandle {
    shared: Arc<PartitionShared>,
}

impl PartitionHandle {
    /// Wraps a freshly generated partition into a handle, open by default.
    pub fn new(partition: Box<dyn Partition>) -> Self {
        Self {
            shared: Arc::new(PartitionShared {
                partition,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Name of the stream this partition belongs to.
    pub fn stream_name(&self) -> &str {
        self.shared.partition.stream_name()
    }

    /// JSON representation of the slice this partition covers, if any.
    pub fn to_slice(&self) -> Option<Value> {
        self.shared.partition.to_slice()
    }

    /// Returns the partition's record sequence.
    pub fn records(&self) -> BoxStream<'_, CdkResult<Record>> {
        self.shared.partition.records()
    }

    /// Whether the partition's reader task has finished emitting all records.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Marks the partition as fully read. Called by the orchestrator when it
    /// processes the partition's completion sentinel.
    pub(crate) fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

impl PartialEq for PartitionHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for PartitionHandle {}

impl Hash for PartitionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.shared) as usize).hash(state);
    }
}

impl fmt::Debug for PartitionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionHandle")
            .field("partition", &self.shared.partition)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug)]
    struct EmptyPartition;

    impl Partition for EmptyPartition {
        fn stream_name(&self) -> &str {
            "stream"
        }

        fn records(&self) -> BoxStream<'_, CdkResult<Record>> {
            Box::pin(futures::stream::empty())
        }
    }

    #[test]
    fn test_handle_identity_survives_clone() {
        let handle = PartitionHandle::new(Box::new(EmptyPartition));
        let clone = handle.clone();
        let other = PartitionHandle::new(Box::new(EmptyPartition));

        assert_eq!(handle, clone);
        assert_ne!(handle, other);

        let mut set = HashSet::new();
        set.insert(handle.clone());
        assert!(set.contains(&clone));
        assert!(!set.contains(&other));
    }

    #[test]
    fn test_close_is_visible_through_clones() {
        let handle = PartitionHandle::new(Box::new(EmptyPartition));
        let clone = handle.clone();

        assert!(!clone.is_closed());
        handle.close();
        assert!(clone.is_closed());
    }
}
