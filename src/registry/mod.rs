//! Live-stream registry and broadcast engine
//!
//! The registry is the single synchronization point of the system: a
//! process-wide table of streams and their channels behind one
//! shared/exclusive lock. Producer workers and connection handlers are
//! spawned and stopped through it but live outside the lock once running.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<StreamRegistry>
//!                 ┌───────────────────────────────┐
//!                 │ RwLock<HashMap<StreamId,      │
//!                 │   Stream {                    │
//!                 │     channels: Channel {       │
//!                 │       signals, clients, hls   │
//!                 │     }                         │
//!                 │   }                           │
//!                 │ >>                            │
//!                 └───────────────┬───────────────┘
//!                                 │
//!          ┌──────────────────────┼──────────────────────┐
//!          │                      │                      │
//!          ▼                      ▼                      ▼
//!    [Producer worker]     [Conn handler]          [Conn handler]
//!    cast()/cast_raw()     receivers.recv()        receivers.recv()
//!    update_codecs()             │                       │
//!    unlock() on exit            └──► network ◄──────────┘
//! ```
//!
//! # Backpressure
//!
//! Queues are bounded and writes never block a producer: a packet is
//! delivered, evicts its slow recipient (stop signal + connection close),
//! or is dropped. Lifecycle control is equally non-coercive, a Stop or
//! Restart signal the worker must observe itself.

pub mod client;
pub mod config;
pub mod error;
pub mod packet;
pub mod signal;
pub mod store;
pub mod stream;

pub use client::{Client, ClientMode, ClientReceivers, ConnectionHandle};
pub use config::RegistryConfig;
pub use error::{PersistError, RegistryError, Result};
pub use packet::{CodecInfo, CodecKind, MediaPacket, RawPacket};
pub use signal::{SignalQueue, StreamSignal};
pub use store::StreamRegistry;
pub use stream::{Channel, ChannelStatus, Segment, SegmentRing, Stream};
