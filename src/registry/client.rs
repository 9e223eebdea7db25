//! Per-consumer runtime handle
//!
//! A [`Client`] is the registry-side half of one connected consumer: the
//! sender ends of its bounded queues plus a closable connection handle.
//! The connection handler keeps the matching [`ClientReceivers`] and drains
//! them to the network.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::config::RegistryConfig;
use super::packet::{MediaPacket, RawPacket};
use super::signal::StreamSignal;

/// Closable handle to a consumer's network connection.
///
/// Closing is the second half of slow-consumer eviction; it is expected to
/// unblock the handler's own blocking network operations.
pub trait ConnectionHandle: Send + Sync {
    /// Close the underlying connection
    fn close(&self) -> io::Result<()>;
}

/// Which packet class a consumer receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    /// Protocol-level passthrough: receives [`RawPacket`]s only
    Raw,
    /// Demuxed consumer: receives [`MediaPacket`]s only
    Decoded,
}

/// Registry-side handle for one connected consumer
#[derive(Clone)]
pub struct Client {
    /// Packet class this consumer receives
    pub mode: ClientMode,
    /// Outgoing raw packet queue, written by `cast_raw`
    pub(crate) outgoing_raw: mpsc::Sender<RawPacket>,
    /// Outgoing media packet queue, written by `cast`
    pub(crate) outgoing_media: mpsc::Sender<MediaPacket>,
    /// Control-signal queue, written on eviction
    pub(crate) signals: mpsc::Sender<StreamSignal>,
    /// Closable network handle, closed on eviction
    pub connection: Arc<dyn ConnectionHandle>,
}

/// Consumer-side halves of a client's queues.
///
/// Owned by the connection handler; dropping them marks the client dead to
/// the broadcast engine, which then skips it until the handler removes its
/// map entry.
pub struct ClientReceivers {
    /// Raw packet stream (empty for decoded-mode clients)
    pub raw: mpsc::Receiver<RawPacket>,
    /// Media packet stream (empty for raw-mode clients)
    pub media: mpsc::Receiver<MediaPacket>,
    /// Control signals, Stop means disconnect and deregister
    pub signals: mpsc::Receiver<StreamSignal>,
}

impl Client {
    /// Build a client and its receiver half with queue depths from `config`
    pub fn new(
        mode: ClientMode,
        connection: Arc<dyn ConnectionHandle>,
        config: &RegistryConfig,
    ) -> (Self, ClientReceivers) {
        let (raw_tx, raw_rx) = mpsc::channel(config.outgoing_queue_capacity);
        let (media_tx, media_rx) = mpsc::channel(config.outgoing_queue_capacity);
        let (signal_tx, signal_rx) = mpsc::channel(config.client_signal_capacity);

        (
            Self {
                mode,
                outgoing_raw: raw_tx,
                outgoing_media: media_tx,
                signals: signal_tx,
                connection,
            },
            ClientReceivers {
                raw: raw_rx,
                media: media_rx,
                signals: signal_rx,
            },
        )
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("mode", &self.mode).finish()
    }
}
