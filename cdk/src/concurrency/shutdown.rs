//! Broadcast shutdown signalling for pipeline workers.
//!
//! This module abstracts tokio's watch channels into a shutdown signal that a
//! pipeline can fan out to its workers. The signal carries no payload - receivers
//! only care that a shutdown was requested after they subscribed.

use tokio::sync::watch;

/// Transmitter side of a shutdown channel.
///
/// [`ShutdownTx`] is cheap to clone and can be handed to any component that may
/// need to request a pipeline stop.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    /// Requests shutdown of every subscribed worker.
    ///
    /// Fails only when no receivers are alive, which means there is nothing left
    /// to shut down.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new receiver subscribed to this shutdown channel.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Receiver side of a shutdown channel.
///
/// Workers await `changed()` on this receiver; the initial channel value does not
/// count as a signal, only a send performed after subscription does.
pub type ShutdownRx = watch::Receiver<()>;

/// Creates a new shutdown channel.
///
/// The returned receiver can be dropped when subscribers are created on demand via
/// [`ShutdownTx::subscribe`].
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(tx), rx)
}
