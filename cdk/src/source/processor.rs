use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::bail;
use crate::error::{CdkError, CdkResult, ErrorKind};
use crate::source::partition::PartitionHandle;
use crate::source::queue::{PartitionCompleted, PartitionGenerationCompleted};
use crate::source::repository::MessageRepository;
use crate::source::slices::SliceLogger;
use crate::source::stream::SourceStream;
use crate::source::tasks::{PartitionGenerator, PartitionReader};
use crate::types::{Record, SourceMessage, StreamStatus};
use crate::workers::pool::WorkerPool;

/// The completion ledger and event-dispatch state machine of a sync.
///
/// Exactly one orchestrator task owns a [`ReadProcessor`] and feeds it dequeued
/// items one at a time, so none of this state needs locking: every concurrency
/// hazard is confined to the queue and the worker pool.
///
/// Handlers return the output messages the event produced, in emission order.
#[derive(Debug)]
pub(crate) struct ReadProcessor {
    /// Streams not yet started, in the order they were given.
    streams_to_start: VecDeque<Arc<dyn SourceStream>>,
    /// Every stream of the sync, by name, in the order it was given.
    stream_names: Vec<String>,
    /// Streams whose generator task is currently running, in start order.
    generating: Vec<String>,
    /// Every partition ever generated, per stream.
    partitions: HashMap<String, HashSet<PartitionHandle>>,
    /// Records forwarded so far, per stream.
    record_counter: HashMap<String, u64>,
    /// Ceiling on concurrently generating streams.
    max_concurrent_streams: usize,
    partition_generator: PartitionGenerator,
    partition_reader: PartitionReader,
    pool: WorkerPool,
    message_repository: Arc<dyn MessageRepository>,
    slice_logger: Arc<dyn SliceLogger>,
}

impl ReadProcessor {
    pub(crate) fn new(
        streams: Vec<Arc<dyn SourceStream>>,
        partition_generator: PartitionGenerator,
        partition_reader: PartitionReader,
        pool: WorkerPool,
        message_repository: Arc<dyn MessageRepository>,
        slice_logger: Arc<dyn SliceLogger>,
        max_concurrent_streams: usize,
    ) -> Self {
        let stream_names: Vec<String> = streams
            .iter()
            .map(|stream| stream.name().to_string())
            .collect();
        let partitions = stream_names
            .iter()
            .map(|name| (name.clone(), HashSet::new()))
            .collect();
        let record_counter = stream_names.iter().map(|name| (name.clone(), 0)).collect();

        Self {
            streams_to_start: streams.into(),
            stream_names,
            generating: Vec::new(),
            partitions,
            record_counter,
            max_concurrent_streams,
            partition_generator,
            partition_reader,
            pool,
            message_repository,
            slice_logger,
        }
    }

    /// Starts the next queued stream's partition generator, if any.
    ///
    /// Submits the generator task to the pool, marks the stream as generating and
    /// returns its started status. Returns `None` when every stream has been
    /// started already.
    pub(crate) async fn start_next_partition_generator(
        &mut self,
    ) -> CdkResult<Option<SourceMessage>> {
        let Some(stream) = self.streams_to_start.pop_front() else {
            return Ok(None);
        };
        let stream_name = stream.name().to_string();

        self.pool
            .submit(self.partition_generator.clone().generate_partitions(stream))
            .await?;
        self.generating.push(stream_name.clone());

        info!(stream = %stream_name, "marked stream as started");
        Ok(Some(SourceMessage::stream_status(
            stream_name,
            StreamStatus::Started,
        )))
    }

    /// Handles a newly generated partition.
    ///
    /// Records it as open in the ledger, surfaces its slice through the message
    /// repository when slice logging is on, and submits a reader task for it.
    pub(crate) async fn on_partition(&mut self, partition: PartitionHandle) -> CdkResult<()> {
        let stream_name = partition.stream_name().to_string();
        debug!(stream = %stream_name, "received new partition");

        self.partitions
            .entry(stream_name)
            .or_default()
            .insert(partition.clone());

        if self.slice_logger.should_log_slice_message()
            && let Some(slice) = partition.to_slice()
        {
            self.message_repository
                .emit(self.slice_logger.create_slice_log_message(&slice));
        }

        self.pool
            .submit(self.partition_reader.clone().process_partition(partition))
            .await
    }

    /// Handles a stream's generation-complete sentinel.
    ///
    /// The stream stops counting as generating; if all of its partitions are
    /// already closed it is complete. A freed slot under the concurrency ceiling
    /// goes to the next queued stream.
    pub(crate) async fn on_partition_generation_completed(
        &mut self,
        sentinel: PartitionGenerationCompleted,
    ) -> CdkResult<Vec<SourceMessage>> {
        let stream_name = sentinel.stream_name;
        let Some(index) = self.generating.iter().position(|name| name == &stream_name) else {
            bail!(
                ErrorKind::InvalidState,
                "Generation sentinel for unknown stream",
                format!("stream `{stream_name}` is not currently generating partitions")
            );
        };
        self.generating.remove(index);

        info!(stream = %stream_name, "finished generating partitions");

        let mut messages = Vec::new();
        if self.is_stream_done(&stream_name) {
            messages.push(self.stream_completed(&stream_name));
        }

        if !self.streams_to_start.is_empty() && self.generating.len() < self.max_concurrent_streams
            && let Some(message) = self.start_next_partition_generator().await?
        {
            messages.push(message);
        }

        Ok(messages)
    }

    /// Handles a partition's completion sentinel.
    ///
    /// Closes the partition, reports the owning stream as complete when it was the
    /// last open piece, and drains the message repository so buffered side-channel
    /// messages surface right after the partition that produced them.
    pub(crate) fn on_partition_complete_sentinel(
        &mut self,
        sentinel: PartitionCompleted,
    ) -> CdkResult<Vec<SourceMessage>> {
        let partition = sentinel.partition;
        let stream_name = partition.stream_name().to_string();

        let known = self
            .partitions
            .get(&stream_name)
            .is_some_and(|partitions| partitions.contains(&partition));
        if !known {
            bail!(
                ErrorKind::InvalidState,
                "Completion sentinel for unknown partition",
                format!("stream `{stream_name}` has no such partition in the ledger")
            );
        }

        partition.close();
        debug!(stream = %stream_name, "partition closed");

        let mut messages = Vec::new();
        if self.is_stream_done(&stream_name) {
            messages.push(self.stream_completed(&stream_name));
        }
        messages.extend(self.message_repository.drain());

        Ok(messages)
    }

    /// Handles one record.
    ///
    /// The stream's running status precedes its first record; the record itself is
    /// forwarded immediately, followed by any buffered side-channel messages.
    pub(crate) fn on_record(&mut self, record: Record) -> CdkResult<Vec<SourceMessage>> {
        let Some(counter) = self.record_counter.get_mut(&record.stream_name) else {
            bail!(
                ErrorKind::InvalidState,
                "Record for unknown stream",
                format!("stream `{}` is not part of this sync", record.stream_name)
            );
        };
        *counter += 1;

        let mut messages = Vec::new();
        if *counter == 1 {
            messages.push(SourceMessage::stream_status(
                record.stream_name.clone(),
                StreamStatus::Running,
            ));
        }
        messages.push(SourceMessage::record(record));
        messages.extend(self.message_repository.drain());

        Ok(messages)
    }

    /// Handles a producer-task error: tears the sync down and hands the error back
    /// for propagation.
    ///
    /// Returns the terminal statuses to emit before re-raising, alongside the
    /// original error.
    pub(crate) async fn on_exception(&mut self, err: CdkError) -> (Vec<SourceMessage>, CdkError) {
        error!(error = %err, "a stream task failed, stopping the sync");

        let messages = self.stop_streams().await;
        (messages, err)
    }

    /// Stops all in-flight work and reports unfinished streams as incomplete.
    ///
    /// A stream counts as unfinished when any of its partitions is still open;
    /// streams that never produced a partition get no terminal status here.
    pub(crate) async fn stop_streams(&mut self) -> Vec<SourceMessage> {
        self.pool.shutdown().await;

        let mut messages = Vec::new();
        for stream_name in &self.stream_names {
            let unfinished = self
                .partitions
                .get(stream_name)
                .is_some_and(|partitions| partitions.iter().any(|p| !p.is_closed()));
            if unfinished {
                messages.push(SourceMessage::stream_status(
                    stream_name.clone(),
                    StreamStatus::Incomplete,
                ));
            }
        }
        messages
    }

    /// Whether the whole sync is finished: nothing left to start, nothing
    /// generating, and every known partition closed.
    ///
    /// Pure predicate over the ledger; repeated evaluation with no intervening
    /// queue activity returns a stable value.
    pub(crate) fn is_done(&self) -> bool {
        self.streams_to_start.is_empty()
            && self.generating.is_empty()
            && self
                .partitions
                .values()
                .flatten()
                .all(|partition| partition.is_closed())
    }

    fn is_stream_done(&self, stream_name: &str) -> bool {
        !self.generating.iter().any(|name| name == stream_name)
            && self
                .partitions
                .get(stream_name)
                .is_none_or(|partitions| partitions.iter().all(|p| p.is_closed()))
    }

    fn stream_completed(&self, stream_name: &str) -> SourceMessage {
        let records = self
            .record_counter
            .get(stream_name)
            .copied()
            .unwrap_or_default();
        info!(stream = %stream_name, records, "finished syncing stream");

        SourceMessage::stream_status(stream_name.to_string(), StreamStatus::Complete)
    }
}
