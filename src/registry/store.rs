//! Stream registry implementation
//!
//! The central registry holding every stream and channel behind one
//! shared/exclusive lock. All lifecycle and broadcast operations run for
//! their full duration under this lock; broadcasts are therefore
//! serialized across the whole registry, which buys a strict cross-channel
//! ordering guarantee at the cost of throughput under many concurrently
//! active channels.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::persist::ConfigStore;
use crate::worker::ProducerSpawner;

use super::client::{Client, ClientMode, ClientReceivers, ConnectionHandle};
use super::config::RegistryConfig;
use super::error::{RegistryError, Result};
use super::packet::{CodecInfo, MediaPacket, RawPacket};
use super::signal::{SignalQueue, StreamSignal};
use super::stream::{ack_never, Channel, ChannelStatus, Segment, SegmentRing, Stream};

/// Process-wide table of live streams.
///
/// Producer workers are started through the injected [`ProducerSpawner`]
/// and stopped cooperatively via channel signal queues; the configuration
/// is written through the injected [`ConfigStore`] after every mutation of
/// the stream table.
pub struct StreamRegistry {
    /// Stream table, one coarse lock for the whole tree
    streams: RwLock<HashMap<String, Stream>>,

    /// Durable configuration collaborator
    store: Arc<dyn ConfigStore>,

    /// Producer worker launcher
    spawner: Arc<dyn ProducerSpawner>,

    /// Capacities and poll budget
    config: RegistryConfig,
}

impl StreamRegistry {
    /// Create a registry with default configuration
    pub fn new(store: Arc<dyn ConfigStore>, spawner: Arc<dyn ProducerSpawner>) -> Self {
        Self::with_config(store, spawner, RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(
        store: Arc<dyn ConfigStore>,
        spawner: Arc<dyn ProducerSpawner>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            store,
            spawner,
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Produce a fully initialized runtime copy of a bare channel spec:
    /// empty client map, sentinel-past ack, empty segment ring, fresh
    /// signal queue. Infallible.
    pub fn init_channel_runtime(&self, mut channel: Channel) -> Channel {
        channel.run_lock = false;
        channel.ack = ack_never();
        channel.status = ChannelStatus::Offline;
        channel.codecs = None;
        channel.sdp = Bytes::new();
        channel.signals = SignalQueue::new(self.config.signal_queue_capacity);
        channel.clients = Arc::new(parking_lot::Mutex::new(HashMap::new()));
        channel.hls = Arc::new(parking_lot::Mutex::new(SegmentRing::new(
            self.config.hls_window,
        )));
        channel
    }

    /// Install preloaded streams (e.g. from the config file) without
    /// persisting or starting anything; follow with [`run_all`].
    ///
    /// [`run_all`]: StreamRegistry::run_all
    pub async fn load(&self, streams: HashMap<String, Stream>) {
        let mut table = self.streams.write().await;
        for (stream_id, mut stream) in streams {
            stream.channels = stream
                .channels
                .into_iter()
                .map(|(channel_id, channel)| (channel_id, self.init_channel_runtime(channel)))
                .collect();
            table.insert(stream_id, stream);
        }
    }

    /// Check channel presence, refreshing its `ack` on a hit.
    ///
    /// The combined probe-and-touch keeps an on-demand channel warm while
    /// consumers keep asking for it.
    pub async fn channel_exists(&self, stream_id: &str, channel_id: u32) -> bool {
        let mut streams = self.streams.write().await;
        match streams
            .get_mut(stream_id)
            .and_then(|stream| stream.channels.get_mut(&channel_id))
        {
            Some(channel) => {
                channel.ack = SystemTime::now();
                true
            }
            None => false,
        }
    }

    /// Start every non-on-demand channel unconditionally.
    ///
    /// Intended for process startup only: `run_lock` is not checked, so
    /// calling this on an already-running registry risks duplicate
    /// workers.
    pub async fn run_all(&self) {
        let mut streams = self.streams.write().await;
        for (stream_id, stream) in streams.iter_mut() {
            for (&channel_id, channel) in stream.channels.iter_mut() {
                if !channel.on_demand {
                    channel.run_lock = true;
                    self.spawner.spawn(stream_id, channel_id);
                    tracing::info!(stream = %stream_id, channel = channel_id, "producer started");
                }
            }
        }
    }

    /// Idempotent lazy start: spawn a producer iff none owns the channel
    pub async fn run(&self, stream_id: &str, channel_id: u32) -> Result<()> {
        let mut streams = self.streams.write().await;
        let stream = streams
            .get_mut(stream_id)
            .ok_or(RegistryError::StreamNotFound)?;
        let channel = stream
            .channels
            .get_mut(&channel_id)
            .ok_or(RegistryError::ChannelNotFound)?;

        if !channel.run_lock {
            channel.run_lock = true;
            self.spawner.spawn(stream_id, channel_id);
            tracing::info!(stream = %stream_id, channel = channel_id, "producer started");
        }
        Ok(())
    }

    /// Release channel ownership; called by a producer worker as it exits
    pub async fn unlock(&self, stream_id: &str, channel_id: u32) -> Result<()> {
        let mut streams = self.streams.write().await;
        let stream = streams
            .get_mut(stream_id)
            .ok_or(RegistryError::StreamNotFound)?;
        let channel = stream
            .channels
            .get_mut(&channel_id)
            .ok_or(RegistryError::ChannelNotFound)?;

        channel.run_lock = false;
        tracing::debug!(stream = %stream_id, channel = channel_id, "producer unlocked");
        Ok(())
    }

    /// Snapshot one channel.
    ///
    /// Scalar fields are copied; the client map, signal queue and HLS ring
    /// in the snapshot remain the live handles.
    pub async fn control(&self, stream_id: &str, channel_id: u32) -> Result<Channel> {
        let streams = self.streams.read().await;
        let stream = streams.get(stream_id).ok_or(RegistryError::StreamNotFound)?;
        stream
            .channels
            .get(&channel_id)
            .cloned()
            .ok_or(RegistryError::ChannelNotFound)
    }

    /// Snapshot the whole stream table.
    ///
    /// The returned map is a copy (later `add`/`delete` do not affect it)
    /// but the contained channel handles stay shared with the live
    /// registry, so external layers can keep routing I/O through it.
    pub async fn list(&self) -> HashMap<String, Stream> {
        self.streams.read().await.clone()
    }

    /// Snapshot one stream
    pub async fn info(&self, stream_id: &str) -> Result<Stream> {
        let streams = self.streams.read().await;
        streams
            .get(stream_id)
            .cloned()
            .ok_or(RegistryError::StreamNotFound)
    }

    /// Register a new stream: initialize every channel's runtime,
    /// auto-start the non-on-demand ones, install, persist.
    ///
    /// A persistence failure is returned but the stream stays live in
    /// memory; there is no rollback.
    pub async fn add(&self, stream_id: &str, stream: Stream) -> Result<()> {
        let mut streams = self.streams.write().await;
        if streams.contains_key(stream_id) {
            return Err(RegistryError::StreamAlreadyExists);
        }

        let stream = self.install_channels(stream_id, stream);
        streams.insert(stream_id.to_string(), stream);
        tracing::info!(stream = %stream_id, "stream added");

        self.persist(&streams)
    }

    /// Replace a stream's definition: stop every running old channel, then
    /// apply the same initialize/auto-start policy as [`add`], install,
    /// persist.
    ///
    /// [`add`]: StreamRegistry::add
    pub async fn edit(&self, stream_id: &str, stream: Stream) -> Result<()> {
        let mut streams = self.streams.write().await;
        let old = streams.get(stream_id).ok_or(RegistryError::StreamNotFound)?;

        let running: Vec<SignalQueue> = old
            .channels
            .values()
            .filter(|channel| channel.run_lock)
            .map(|channel| channel.signals.clone())
            .collect();
        for signals in running {
            signals.send(StreamSignal::Stop).await;
        }

        let stream = self.install_channels(stream_id, stream);
        streams.insert(stream_id.to_string(), stream);
        tracing::info!(stream = %stream_id, "stream edited");

        self.persist(&streams)
    }

    /// Ask every running channel's producer to reconnect to its source
    pub async fn reload(&self, stream_id: &str) -> Result<()> {
        let streams = self.streams.read().await;
        let stream = streams.get(stream_id).ok_or(RegistryError::StreamNotFound)?;

        for channel in stream.channels.values() {
            if channel.run_lock {
                channel.signals.send(StreamSignal::Restart).await;
            }
        }
        tracing::info!(stream = %stream_id, "stream reload requested");
        Ok(())
    }

    /// Remove a stream, stopping every running channel first, then persist
    pub async fn delete(&self, stream_id: &str) -> Result<()> {
        let mut streams = self.streams.write().await;
        let stream = streams.get(stream_id).ok_or(RegistryError::StreamNotFound)?;

        let running: Vec<SignalQueue> = stream
            .channels
            .values()
            .filter(|channel| channel.run_lock)
            .map(|channel| channel.signals.clone())
            .collect();
        for signals in running {
            signals.send(StreamSignal::Stop).await;
        }

        streams.remove(stream_id);
        tracing::info!(stream = %stream_id, "stream deleted");

        self.persist(&streams)
    }

    /// Store negotiated codecs and session description, unblocking any
    /// pending readiness wait. Fire-and-forget: a missing channel is
    /// ignored.
    pub async fn update_codecs(
        &self,
        stream_id: &str,
        channel_id: u32,
        codecs: Vec<CodecInfo>,
        sdp: Bytes,
    ) {
        let mut streams = self.streams.write().await;
        if let Some(channel) = streams
            .get_mut(stream_id)
            .and_then(|stream| stream.channels.get_mut(&channel_id))
        {
            tracing::debug!(
                stream = %stream_id,
                channel = channel_id,
                tracks = codecs.len(),
                "codecs updated"
            );
            channel.codecs = Some(codecs);
            channel.sdp = sdp;
        }
    }

    /// Get the channel's codecs, waiting for the producer to negotiate.
    ///
    /// Sleep-polls at the configured interval until `codecs` is set. An
    /// exhausted poll budget reports [`RegistryError::StreamNotFound`],
    /// same as a stream that never existed.
    pub async fn codecs(&self, stream_id: &str, channel_id: u32) -> Result<Vec<CodecInfo>> {
        self.await_ready(stream_id, channel_id, |channel| channel.codecs.clone())
            .await
    }

    /// Get the channel's session description, same waiting contract as
    /// [`codecs`] but gated on a non-empty blob.
    ///
    /// [`codecs`]: StreamRegistry::codecs
    pub async fn sdp(&self, stream_id: &str, channel_id: u32) -> Result<Bytes> {
        self.await_ready(stream_id, channel_id, |channel| {
            if channel.sdp.is_empty() {
                None
            } else {
                Some(channel.sdp.clone())
            }
        })
        .await
    }

    /// Record producer-reported health. Fire-and-forget: a missing channel
    /// is ignored.
    pub async fn set_status(&self, stream_id: &str, channel_id: u32, status: ChannelStatus) {
        let mut streams = self.streams.write().await;
        if let Some(channel) = streams
            .get_mut(stream_id)
            .and_then(|stream| stream.channels.get_mut(&channel_id))
        {
            channel.status = status;
        }
    }

    /// Deliver a raw protocol packet to every raw-mode client of the
    /// channel, applying the slow-consumer policy per client.
    pub async fn cast_raw(&self, stream_id: &str, channel_id: u32, packet: RawPacket) {
        let mut streams = self.streams.write().await;
        let Some(channel) = streams
            .get_mut(stream_id)
            .and_then(|stream| stream.channels.get_mut(&channel_id))
        else {
            return;
        };

        {
            let clients = channel.clients.lock();
            if clients.is_empty() {
                return;
            }
            for client in clients.values() {
                if client.mode != ClientMode::Raw {
                    continue;
                }
                match client.outgoing_raw.try_send(packet.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        self.evict(stream_id, channel_id, client)
                    }
                    // Handler already dropped its receivers; it removes
                    // its own map entry on the way out.
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }
        }
        channel.ack = SystemTime::now();
    }

    /// Deliver a media packet to every decoded-mode client of the channel,
    /// applying the slow-consumer policy per client.
    pub async fn cast(&self, stream_id: &str, channel_id: u32, packet: MediaPacket) {
        let mut streams = self.streams.write().await;
        let Some(channel) = streams
            .get_mut(stream_id)
            .and_then(|stream| stream.channels.get_mut(&channel_id))
        else {
            return;
        };

        {
            let clients = channel.clients.lock();
            if clients.is_empty() {
                return;
            }
            for client in clients.values() {
                if client.mode == ClientMode::Raw {
                    continue;
                }
                match client.outgoing_media.try_send(packet.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        self.evict(stream_id, channel_id, client)
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }
        }
        channel.ack = SystemTime::now();
    }

    /// Register a consumer: build its queue pair, insert it into the
    /// channel's client map under a fresh id, hand the receiver half back
    /// to the connection handler.
    pub async fn client_add(
        &self,
        stream_id: &str,
        channel_id: u32,
        mode: ClientMode,
        connection: Arc<dyn ConnectionHandle>,
    ) -> Result<(String, ClientReceivers)> {
        let streams = self.streams.read().await;
        let stream = streams.get(stream_id).ok_or(RegistryError::StreamNotFound)?;
        let channel = stream
            .channels
            .get(&channel_id)
            .ok_or(RegistryError::ChannelNotFound)?;

        let client_id = Uuid::new_v4().to_string();
        let (client, receivers) = Client::new(mode, connection, &self.config);
        channel.clients.lock().insert(client_id.clone(), client);

        tracing::debug!(
            stream = %stream_id,
            channel = channel_id,
            client = %client_id,
            ?mode,
            "client added"
        );
        Ok((client_id, receivers))
    }

    /// Remove a consumer's entry; called by its own connection handler on
    /// disconnect. Silent if the stream, channel or client is already
    /// gone.
    pub async fn client_delete(&self, stream_id: &str, channel_id: u32, client_id: &str) {
        let streams = self.streams.read().await;
        if let Some(channel) = streams
            .get(stream_id)
            .and_then(|stream| stream.channels.get(&channel_id))
        {
            if channel.clients.lock().remove(client_id).is_some() {
                tracing::debug!(
                    stream = %stream_id,
                    channel = channel_id,
                    client = %client_id,
                    "client removed"
                );
            }
        }
    }

    /// Claim a channel's control-signal receiver; the producer worker
    /// calls this once at startup. `None` if the channel is missing or the
    /// receiver was already claimed.
    pub async fn take_signals(
        &self,
        stream_id: &str,
        channel_id: u32,
    ) -> Option<mpsc::Receiver<StreamSignal>> {
        let streams = self.streams.read().await;
        streams
            .get(stream_id)?
            .channels
            .get(&channel_id)?
            .signals
            .take_receiver()
    }

    /// Append a segment to the channel's HLS ring, trimming it to the
    /// configured window. Fire-and-forget: a missing channel is ignored.
    pub async fn hls_segment_add(&self, stream_id: &str, channel_id: u32, segment: Segment) {
        let streams = self.streams.read().await;
        if let Some(channel) = streams
            .get(stream_id)
            .and_then(|stream| stream.channels.get(&channel_id))
        {
            channel.hls.lock().push(segment);
        }
    }

    /// Retained HLS segments of a channel, oldest first
    pub async fn hls_segments(
        &self,
        stream_id: &str,
        channel_id: u32,
    ) -> Result<Vec<(u64, Segment)>> {
        let streams = self.streams.read().await;
        let stream = streams.get(stream_id).ok_or(RegistryError::StreamNotFound)?;
        let channel = stream
            .channels
            .get(&channel_id)
            .ok_or(RegistryError::ChannelNotFound)?;
        let entries = channel.hls.lock().entries();
        Ok(entries)
    }

    /// Initialize runtime state for every channel of `stream` and
    /// auto-start the non-on-demand ones. Runs under the write lock held
    /// by the caller.
    fn install_channels(&self, stream_id: &str, mut stream: Stream) -> Stream {
        stream.channels = stream
            .channels
            .into_iter()
            .map(|(channel_id, channel)| {
                let mut channel = self.init_channel_runtime(channel);
                if !channel.on_demand {
                    channel.run_lock = true;
                    self.spawner.spawn(stream_id, channel_id);
                    tracing::info!(stream = %stream_id, channel = channel_id, "producer started");
                }
                (channel_id, channel)
            })
            .collect();
        stream
    }

    /// Sleep-poll until `ready` yields a value for the channel.
    ///
    /// Stream gone mid-wait reports stream-not-found, channel gone reports
    /// channel-not-found; an exhausted budget reports stream-not-found,
    /// deliberately indistinguishable from a stream that never existed.
    async fn await_ready<T>(
        &self,
        stream_id: &str,
        channel_id: u32,
        ready: impl Fn(&Channel) -> Option<T>,
    ) -> Result<T> {
        for _ in 0..self.config.readiness_poll_attempts {
            {
                let streams = self.streams.read().await;
                let stream = streams.get(stream_id).ok_or(RegistryError::StreamNotFound)?;
                let channel = stream
                    .channels
                    .get(&channel_id)
                    .ok_or(RegistryError::ChannelNotFound)?;
                if let Some(value) = ready(channel) {
                    return Ok(value);
                }
            }
            tokio::time::sleep(self.config.readiness_poll_interval).await;
        }
        Err(RegistryError::StreamNotFound)
    }

    /// Slow-consumer eviction: enqueue a stop signal and close the
    /// connection. With the signal queue also saturated, do nothing; the
    /// packet is simply dropped for this client.
    fn evict(&self, stream_id: &str, channel_id: u32, client: &Client) {
        if client.signals.try_send(StreamSignal::Stop).is_ok() {
            tracing::debug!(stream = %stream_id, channel = channel_id, "slow consumer evicted");
            if let Err(err) = client.connection.close() {
                tracing::error!(
                    stream = %stream_id,
                    channel = channel_id,
                    error = %err,
                    "failed to close evicted client connection"
                );
            }
        }
    }

    /// Write the configuration through the store, mapping its error
    /// verbatim. The in-memory table is already updated and stays so.
    fn persist(&self, streams: &HashMap<String, Stream>) -> Result<()> {
        self.store.save(streams).map_err(RegistryError::Persist)
    }
}
