//! # streamhub-rs
//!
//! Live-stream registry and broadcast/dispatch engine: a concurrently
//! accessed table of active media streams and their channels, with
//! per-channel producer lifecycle control, codec/session-description
//! readiness, HLS segment rings and packet fan-out to connected consumers
//! under a bounded-queue slow-consumer eviction policy.
//!
//! Protocol I/O, source demuxing and the HTTP surface live outside this
//! crate; they drive the registry through the operations on
//! [`StreamRegistry`] and the contracts described in [`worker`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use streamhub_rs::persist::JsonFileStore;
//! use streamhub_rs::registry::StreamRegistry;
//! use streamhub_rs::worker::ProducerSpawner;
//!
//! # async fn start() {
//! let store = Arc::new(JsonFileStore::new("streams.json"));
//! let spawner: Arc<dyn ProducerSpawner> = Arc::new(|stream_id: &str, channel_id: u32| {
//!     let stream_id = stream_id.to_string();
//!     tokio::spawn(async move {
//!         // connect to the source, drain signals, cast packets,
//!         // unlock on exit
//!         let _ = (stream_id, channel_id);
//!     });
//! });
//!
//! let registry = Arc::new(StreamRegistry::new(store, spawner));
//! registry
//!     .load(JsonFileStore::load("streams.json").unwrap_or_default())
//!     .await;
//! registry.run_all().await;
//! # }
//! ```

pub mod persist;
pub mod registry;
pub mod worker;

pub use persist::{ConfigStore, JsonFileStore, MemoryStore};
pub use registry::{
    Channel, ChannelStatus, Client, ClientMode, ClientReceivers, CodecInfo, CodecKind,
    ConnectionHandle, MediaPacket, RawPacket, RegistryConfig, RegistryError, Result, Segment,
    SegmentRing, SignalQueue, Stream, StreamRegistry, StreamSignal,
};
pub use worker::{NoopSpawner, ProducerSpawner};
