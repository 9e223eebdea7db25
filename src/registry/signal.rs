//! Control signals and the per-channel signal queue
//!
//! Lifecycle control is cooperative: the registry never terminates a
//! producer worker, it only enqueues a [`StreamSignal`] that the worker's
//! control loop must observe and act on.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Default depth of a channel's control-signal queue
pub const DEFAULT_SIGNAL_CAPACITY: usize = 100;

/// Control signal delivered to a producer worker or a client drain loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSignal {
    /// Terminate: stop reading from the source and exit
    Stop,
    /// Reconnect to the source without discarding registry state
    Restart,
}

/// Bounded FIFO of control signals for one channel.
///
/// The sender side is cloned freely with channel snapshots; the single
/// receiver is parked inside the queue until the producer worker claims it
/// with [`SignalQueue::take_receiver`].
#[derive(Debug, Clone)]
pub struct SignalQueue {
    tx: mpsc::Sender<StreamSignal>,
    rx: Arc<Mutex<Option<mpsc::Receiver<StreamSignal>>>>,
}

impl SignalQueue {
    /// Create a queue bounded to `capacity` pending signals
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Enqueue a signal, waiting for room if the queue is saturated.
    ///
    /// Saturation only happens when the worker stops draining; callers
    /// holding the registry lock accept that stall. A dropped receiver
    /// (worker already gone) discards the signal.
    pub async fn send(&self, signal: StreamSignal) {
        if self.tx.send(signal).await.is_err() {
            tracing::debug!(?signal, "signal receiver dropped, discarding");
        }
    }

    /// Claim the consuming end of the queue.
    ///
    /// Returns `None` if a worker already claimed it.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<StreamSignal>> {
        self.rx.lock().take()
    }
}

impl Default for SignalQueue {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNAL_CAPACITY)
    }
}
