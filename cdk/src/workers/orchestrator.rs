use cdk_config::shared::PipelineConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{Instrument, info};

use crate::bail;
use crate::cdk_error;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{CdkResult, ErrorKind};
use crate::sink::base::MessageSink;
use crate::source::processor::ReadProcessor;
use crate::source::queue::{QueueItem, QueueRx};
use crate::types::PipelineId;
use crate::workers::base::{Worker, WorkerHandle};
use crate::workers::pool::WorkerPool;

/// Handle for monitoring and controlling the orchestrator worker.
///
/// [`OrchestratorWorkerHandle`] enables waiting for the sync to finish and
/// retrieving its final result. It properly surfaces panics that might occur
/// within the worker task.
#[derive(Debug)]
pub struct OrchestratorWorkerHandle {
    handle: Option<JoinHandle<CdkResult<()>>>,
}

impl WorkerHandle for OrchestratorWorkerHandle {
    async fn wait(mut self) -> CdkResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        handle.await.map_err(|err| {
            if err.is_cancelled() {
                cdk_error!(
                    ErrorKind::WorkerCancelled,
                    "Orchestrator worker was cancelled",
                    err
                )
            } else {
                cdk_error!(
                    ErrorKind::WorkerPanic,
                    "Orchestrator worker panicked",
                    err
                )
            }
        })??;

        Ok(())
    }
}

/// The single consumer task of one sync.
///
/// [`OrchestratorWorker`] owns the queue receiver and the completion ledger
/// (through [`ReadProcessor`]); it is the only place where ledger state is
/// mutated, which makes the whole completion protocol a sequential state
/// machine. Each dequeued item is dispatched on its variant and the resulting
/// messages are forwarded to the sink in order.
///
/// The worker terminates when every stream is done, when a producer task fails
/// (propagating that error), or when a shutdown is requested.
#[derive(Debug)]
pub struct OrchestratorWorker<D> {
    pipeline_id: PipelineId,
    config: Arc<PipelineConfig>,
    processor: ReadProcessor,
    queue_rx: QueueRx,
    pool: WorkerPool,
    sink: D,
    shutdown_rx: ShutdownRx,
}

impl<D> OrchestratorWorker<D> {
    pub(crate) fn new(
        pipeline_id: PipelineId,
        config: Arc<PipelineConfig>,
        processor: ReadProcessor,
        queue_rx: QueueRx,
        pool: WorkerPool,
        sink: D,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            pipeline_id,
            config,
            processor,
            queue_rx,
            pool,
            sink,
            shutdown_rx,
        }
    }
}

impl<D> Worker<OrchestratorWorkerHandle> for OrchestratorWorker<D>
where
    D: MessageSink + Send + Sync + 'static,
{
    type Error = crate::error::CdkError;

    async fn start(self) -> CdkResult<OrchestratorWorkerHandle> {
        info!("starting orchestrator worker");

        let orchestrator_span =
            tracing::info_span!("orchestrator_worker", pipeline_id = self.pipeline_id);
        let orchestrator = async move { self.run().await }.instrument(orchestrator_span.or_current());

        let handle = tokio::spawn(orchestrator);

        Ok(OrchestratorWorkerHandle {
            handle: Some(handle),
        })
    }
}

impl<D> OrchestratorWorker<D>
where
    D: MessageSink + Send + Sync + 'static,
{
    async fn run(mut self) -> CdkResult<()> {
        let result = self.run_loop().await;

        // Any exit path leaves no work behind; shutting down twice is a no-op.
        if result.is_err() {
            self.pool.shutdown().await;
        }

        result
    }

    async fn run_loop(&mut self) -> CdkResult<()> {
        // Prime generators up to the concurrency ceiling; the remaining streams
        // start one by one as earlier generators finish.
        for _ in 0..self.config.max_concurrent_streams {
            let Some(message) = self.processor.start_next_partition_generator().await? else {
                break;
            };
            self.sink.emit(message).await?;
        }

        let queue_timeout = self.config.queue_timeout();
        // A closed shutdown channel only means no one can request a stop anymore,
        // so the branch is disabled rather than treated as a signal.
        let mut shutdown_listening = true;
        while !self.processor.is_done() {
            tokio::select! {
                changed = self.shutdown_rx.changed(), if shutdown_listening => {
                    if changed.is_err() {
                        shutdown_listening = false;
                        continue;
                    }

                    info!("shutdown requested, stopping the sync");
                    for message in self.processor.stop_streams().await {
                        self.sink.emit(message).await?;
                    }
                    return Ok(());
                }
                dequeued = timeout(queue_timeout, self.queue_rx.recv()) => {
                    match dequeued {
                        Err(_) => {
                            // Producers stopped producing without signalling:
                            // with the completion protocol intact this cannot
                            // happen, so treat it as fatal rather than waiting
                            // forever on a dead pipeline.
                            for message in self.processor.stop_streams().await {
                                self.sink.emit(message).await?;
                            }
                            bail!(
                                ErrorKind::PipelineStalled,
                                "Partition queue stalled",
                                format!(
                                    "no queue activity for {} ms while streams were unfinished",
                                    self.config.queue_timeout_ms
                                )
                            );
                        }
                        Ok(None) => {
                            bail!(
                                ErrorKind::InvalidState,
                                "Partition queue closed unexpectedly",
                                "all queue senders dropped while streams were unfinished"
                            );
                        }
                        Ok(Some(item)) => self.handle_queue_item(item).await?,
                    }
                }
            }
        }

        // The loop believes all work is done; the pool must agree.
        self.pool.ensure_drained().await?;

        info!("orchestrator worker completed successfully");
        Ok(())
    }

    /// Dispatches one dequeued item on its variant.
    async fn handle_queue_item(&mut self, item: QueueItem) -> CdkResult<()> {
        let messages = match item {
            QueueItem::Partition(partition) => {
                self.processor.on_partition(partition).await?;
                Vec::new()
            }
            QueueItem::Record(record) => self.processor.on_record(record)?,
            QueueItem::GenerationCompleted(sentinel) => {
                self.processor
                    .on_partition_generation_completed(sentinel)
                    .await?
            }
            QueueItem::PartitionCompleted(sentinel) => {
                self.processor.on_partition_complete_sentinel(sentinel)?
            }
            QueueItem::Error(err) => {
                let (messages, err) = self.processor.on_exception(err).await;
                for message in messages {
                    self.sink.emit(message).await?;
                }
                return Err(err);
            }
        };

        for message in messages {
            self.sink.emit(message).await?;
        }

        Ok(())
    }
}
