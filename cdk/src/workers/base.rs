use std::future::Future;

use crate::error::CdkResult;

/// Trait for background workers in the extraction pipeline.
///
/// [`Worker`] defines the interface for starting background workers that handle
/// different aspects of a sync. Workers return handles that can be used to wait
/// for completion.
///
/// The generic parameter `H` represents the handle type returned when the worker starts.
pub trait Worker<H>
where
    H: WorkerHandle,
{
    /// Error type returned when worker startup fails.
    type Error;

    /// Starts the worker and returns a handle for monitoring its execution.
    ///
    /// This method begins background processing and returns immediately with a handle
    /// that can be used to wait for completion.
    fn start(self) -> impl Future<Output = Result<H, Self::Error>> + Send;
}

/// Handle for a running worker.
///
/// [`WorkerHandle`] enables waiting for worker completion. The handle remains valid
/// even after the worker completes, allowing for result retrieval.
pub trait WorkerHandle {
    /// Waits for the worker to complete and returns the final result.
    ///
    /// This method blocks until the worker finishes processing and returns a result
    /// indicating whether the worker completed successfully or encountered an error.
    /// The handle is consumed by this operation.
    fn wait(self) -> impl Future<Output = CdkResult<()>> + Send;
}
