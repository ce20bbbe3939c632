use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cdk_error;
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::config::PipelineConfig;
use crate::error::{CdkResult, ErrorKind};
use crate::sink::base::MessageSink;
use crate::source::processor::ReadProcessor;
use crate::source::queue::create_partition_queue;
use crate::source::repository::{InMemoryMessageRepository, MessageRepository};
use crate::source::slices::{AlwaysLogSliceLogger, DebugSliceLogger, SliceLogger};
use crate::source::stream::{SourceStream, StreamAvailability};
use crate::source::tasks::{PartitionGenerator, PartitionReader};
use crate::types::PipelineId;
use crate::workers::base::{Worker, WorkerHandle};
use crate::workers::orchestrator::{OrchestratorWorker, OrchestratorWorkerHandle};
use crate::workers::pool::WorkerPool;

#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started {
        orchestrator: OrchestratorWorkerHandle,
    },
}

/// Lifecycle facade for one concurrent sync.
///
/// A [`Pipeline`] wires streams, configuration and a sink to the orchestrated
/// read: `start` spawns the orchestrator worker, `wait` blocks until the sync
/// finishes, and `shutdown` requests an early stop. Streams that report
/// themselves unavailable at start are excluded from the sync with a warning.
#[derive(Debug)]
pub struct Pipeline<D> {
    id: PipelineId,
    config: Arc<PipelineConfig>,
    streams: Vec<Arc<dyn SourceStream>>,
    sink: D,
    message_repository: Arc<dyn MessageRepository>,
    slice_logger: Arc<dyn SliceLogger>,
    state: PipelineState,
    shutdown_tx: ShutdownTx,
}

impl<D> Pipeline<D>
where
    D: MessageSink + Clone + Send + Sync + 'static,
{
    pub fn new(
        id: PipelineId,
        config: PipelineConfig,
        streams: Vec<Arc<dyn SourceStream>>,
        sink: D,
    ) -> Self {
        // We create a watch channel of unit types since this is just used to notify all
        // subscribers that shutdown is needed.
        //
        // Here we are not taking the `shutdown_rx` since we will just extract it from the
        // `shutdown_tx` via the `subscribe` method. This is done to make the code cleaner.
        let (shutdown_tx, _) = create_shutdown_channel();

        let slice_logger: Arc<dyn SliceLogger> = if config.log_slices {
            Arc::new(AlwaysLogSliceLogger)
        } else {
            Arc::new(DebugSliceLogger)
        };

        Self {
            id,
            config: Arc::new(config),
            streams,
            sink,
            message_repository: Arc::new(InMemoryMessageRepository::new()),
            slice_logger,
            state: PipelineState::NotStarted,
            shutdown_tx,
        }
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Replaces the message repository shared with producer tasks.
    pub fn with_message_repository(mut self, message_repository: Arc<dyn MessageRepository>) -> Self {
        self.message_repository = message_repository;
        self
    }

    /// Replaces the slice logger chosen from the configuration.
    pub fn with_slice_logger(mut self, slice_logger: Arc<dyn SliceLogger>) -> Self {
        self.slice_logger = slice_logger;
        self
    }

    pub async fn start(&mut self) -> CdkResult<()> {
        info!(
            pipeline_id = self.id,
            streams = self.streams.len(),
            sink = D::name(),
            "starting pipeline"
        );

        self.config
            .validate()
            .map_err(|err| cdk_error!(ErrorKind::ConfigError, "Invalid pipeline configuration", err))?;

        // We exclude streams that cannot currently be synced; an unavailable
        // stream is not an error for the sync as a whole.
        let mut available_streams = Vec::with_capacity(self.streams.len());
        for stream in &self.streams {
            match stream.check_availability().await? {
                StreamAvailability::Available => available_streams.push(stream.clone()),
                StreamAvailability::Unavailable { reason } => {
                    warn!(
                        stream = stream.name(),
                        reason, "skipping stream that is not available"
                    );
                }
            }
        }

        // We create the shared queue connecting all producer tasks to the single
        // orchestrator consumer, and the pool that bounds those producer tasks.
        let (queue_tx, queue_rx) = create_partition_queue();
        let pool = WorkerPool::new(
            self.config.workers.max_workers as usize,
            self.config.workers.max_outstanding_tasks,
        );

        let processor = ReadProcessor::new(
            available_streams,
            PartitionGenerator::new(queue_tx.clone()),
            PartitionReader::new(queue_tx),
            pool.clone(),
            self.message_repository.clone(),
            self.slice_logger.clone(),
            self.config.max_concurrent_streams,
        );

        let orchestrator = OrchestratorWorker::new(
            self.id,
            self.config.clone(),
            processor,
            queue_rx,
            pool,
            self.sink.clone(),
            self.shutdown_tx.subscribe(),
        )
        .start()
        .await?;

        self.state = PipelineState::Started { orchestrator };

        Ok(())
    }

    pub async fn wait(self) -> CdkResult<()> {
        let PipelineState::Started { orchestrator } = self.state else {
            info!("pipeline was not started, nothing to wait for");

            return Ok(());
        };

        info!("waiting for orchestrator worker to complete");

        orchestrator.wait().await
    }

    pub fn shutdown(&self) {
        info!("trying to shut down the pipeline");

        if let Err(err) = self.shutdown_tx.shutdown() {
            error!("failed to send shutdown signal to the pipeline: {}", err);
            return;
        }

        info!("shut down signal successfully sent to the orchestrator");
    }

    pub async fn shutdown_and_wait(self) -> CdkResult<()> {
        self.shutdown();
        self.wait().await
    }
}
