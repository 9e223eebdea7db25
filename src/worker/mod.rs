//! Producer worker and connection handler contracts
//!
//! The registry owns the existence of streams, channels and clients; the
//! tasks that move media live outside it and interact only through the
//! narrow operations on `StreamRegistry`.
//!
//! # Producer worker
//!
//! One task per active channel, started through a [`ProducerSpawner`] by
//! `add`/`edit`/`run`/`run_all` after `run_lock` is set. A worker must:
//!
//! - claim its control queue with `take_signals` and keep draining it,
//!   reacting to Stop (terminate) and Restart (reconnect to the source),
//!   see [`StreamSignal`](crate::registry::StreamSignal)
//! - call `update_codecs` exactly once source negotiation completes
//! - deliver media through `cast` / `cast_raw`
//! - report health transitions through `set_status`
//! - call `unlock` on termination for any reason, so a later `run` can
//!   start a replacement
//!
//! # Connection handler
//!
//! One task per consumer. It registers itself with `client_add`, drains
//! the returned [`ClientReceivers`](crate::registry::ClientReceivers) to
//! the network, and on disconnect or upon observing a Stop signal removes
//! its own entry with `client_delete`. The registry never removes client
//! entries itself; eviction only enqueues Stop and closes the connection.

/// Starts a producer worker for one channel.
///
/// Called while the registry lock is held, so implementations must only
/// hand off (typically `tokio::spawn`) and return immediately.
pub trait ProducerSpawner: Send + Sync {
    /// Start a worker for `channel_id` of `stream_id`
    fn spawn(&self, stream_id: &str, channel_id: u32);
}

impl<F> ProducerSpawner for F
where
    F: Fn(&str, u32) + Send + Sync,
{
    fn spawn(&self, stream_id: &str, channel_id: u32) {
        self(stream_id, channel_id)
    }
}

/// Spawner for registries that manage workers out of band (tests, embedders)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpawner;

impl ProducerSpawner for NoopSpawner {
    fn spawn(&self, _stream_id: &str, _channel_id: u32) {}
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_closure_spawner() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let spawner: Arc<dyn ProducerSpawner> = Arc::new(move |_: &str, _: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        spawner.spawn("cam1", 0);
        spawner.spawn("cam1", 1);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
