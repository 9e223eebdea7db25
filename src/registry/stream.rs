//! Stream and channel data model
//!
//! A [`Stream`] is a named collection of [`Channel`]s; a channel is one
//! media line with its own producer, consumers and codec state. Only the
//! static descriptive fields are serialized to the configuration file;
//! runtime state is rebuilt by `StreamRegistry::init_channel_runtime`.
//!
//! `Clone` on these types is the snapshot operation: scalar runtime fields
//! are copied by value, while the client map, signal queue and HLS ring are
//! shared handles. External connection handlers rely on that sharing to
//! keep routing I/O through a snapshot taken earlier.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::client::Client;
use super::packet::{CodecInfo, MediaPacket};
use super::signal::SignalQueue;

/// How far in the past a never-touched channel's `ack` is seeded
const ACK_NEVER: Duration = Duration::from_secs(255 * 3600);

/// Sentinel activity timestamp meaning "never touched"
pub(crate) fn ack_never() -> SystemTime {
    SystemTime::now()
        .checked_sub(ACK_NEVER)
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Producer-reported channel health, opaque to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelStatus {
    /// No producer connected to the source
    #[default]
    Offline,
    /// Producer connected and delivering
    Online,
}

/// A named collection of channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    /// Descriptive name, not interpreted by the registry
    #[serde(default)]
    pub name: String,

    /// Channels by id
    pub channels: HashMap<u32, Channel>,
}

impl Stream {
    /// Create an empty stream
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: HashMap::new(),
        }
    }

    /// Add a channel, builder style
    pub fn with_channel(mut self, id: u32, channel: Channel) -> Self {
        self.channels.insert(id, channel);
        self
    }
}

/// One media line within a stream.
///
/// The first block of fields is the static spec persisted to the config
/// file; everything below `run_lock` is runtime state owned by the
/// registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Descriptive name
    #[serde(default)]
    pub name: String,

    /// Source address the producer worker connects to
    pub url: String,

    /// Start only on first explicit run request instead of at stream
    /// creation
    #[serde(default)]
    pub on_demand: bool,

    /// Whether the producer should pick up audio tracks
    #[serde(default)]
    pub audio: bool,

    /// Verbose per-packet logging in the producer worker
    #[serde(default)]
    pub debug: bool,

    /// True while a producer worker owns this channel
    #[serde(skip)]
    pub run_lock: bool,

    /// Last-activity marker, refreshed by existence probes and by
    /// broadcasts reaching at least one client
    #[serde(skip, default = "ack_never")]
    pub ack: SystemTime,

    /// Producer-reported health
    #[serde(skip)]
    pub status: ChannelStatus,

    /// Negotiated track descriptors, `None` until the producer reports them
    #[serde(skip)]
    pub codecs: Option<Vec<CodecInfo>>,

    /// Session description blob, empty until the producer reports it
    #[serde(skip)]
    pub sdp: Bytes,

    /// Control-signal queue consumed by the producer worker
    #[serde(skip)]
    pub signals: SignalQueue,

    /// Connected consumers by client id; shared with snapshots
    #[serde(skip)]
    pub clients: Arc<Mutex<HashMap<String, Client>>>,

    /// HLS segment ring; shared with snapshots, contents opaque
    #[serde(skip)]
    pub hls: Arc<Mutex<SegmentRing>>,
}

impl Channel {
    /// Create a channel spec for the given source address
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            url: url.into(),
            on_demand: false,
            audio: false,
            debug: false,
            run_lock: false,
            ack: ack_never(),
            status: ChannelStatus::Offline,
            codecs: None,
            sdp: Bytes::new(),
            signals: SignalQueue::default(),
            clients: Arc::new(Mutex::new(HashMap::new())),
            hls: Arc::new(Mutex::new(SegmentRing::default())),
        }
    }

    /// Mark the channel on-demand, builder style
    pub fn on_demand(mut self) -> Self {
        self.on_demand = true;
        self
    }

    /// Set the descriptive name, builder style
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of currently registered consumers
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }
}

/// Handle to one produced HLS segment; contents are opaque to the registry
#[derive(Debug, Clone)]
pub struct Segment {
    /// Wall-clock duration of the segment
    pub duration: Duration,
    /// Packets making up the segment
    pub packets: Vec<MediaPacket>,
}

impl Segment {
    /// Create a segment handle
    pub fn new(duration: Duration, packets: Vec<MediaPacket>) -> Self {
        Self { duration, packets }
    }
}

/// Default number of segments kept per channel
pub const DEFAULT_HLS_WINDOW: usize = 6;

/// Ring of the newest HLS segments, keyed by a monotone segment index
#[derive(Debug)]
pub struct SegmentRing {
    window: usize,
    next_index: u64,
    segments: BTreeMap<u64, Segment>,
}

impl SegmentRing {
    /// Create a ring keeping the newest `window` segments
    pub fn new(window: usize) -> Self {
        Self {
            window,
            next_index: 0,
            segments: BTreeMap::new(),
        }
    }

    /// Append a segment, dropping the oldest entries beyond the window.
    ///
    /// Returns the index assigned to the segment.
    pub fn push(&mut self, segment: Segment) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        self.segments.insert(index, segment);
        while self.segments.len() > self.window {
            self.segments.pop_first();
        }
        index
    }

    /// Segments in index order, oldest first
    pub fn entries(&self) -> Vec<(u64, Segment)> {
        self.segments
            .iter()
            .map(|(index, segment)| (*index, segment.clone()))
            .collect()
    }

    /// Number of retained segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True if no segment has been retained
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Default for SegmentRing {
    fn default() -> Self {
        Self::new(DEFAULT_HLS_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_sentinel_is_past() {
        assert!(ack_never() < SystemTime::now());
    }

    #[test]
    fn test_segment_ring_trims_to_window() {
        let mut ring = SegmentRing::new(3);

        for _ in 0..5 {
            ring.push(Segment::new(Duration::from_secs(2), Vec::new()));
        }

        assert_eq!(ring.len(), 3);
        let indices: Vec<u64> = ring.entries().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![2, 3, 4]);

        // Indices keep growing past trimmed entries
        assert_eq!(ring.push(Segment::new(Duration::ZERO, Vec::new())), 5);
    }

    #[test]
    fn test_snapshot_shares_client_map() {
        let channel = Channel::new("rtsp://camera.local/main");
        let snapshot = channel.clone();

        channel.clients.lock().insert(
            "c1".into(),
            crate::registry::test_support::decoded_client().0,
        );

        assert_eq!(snapshot.client_count(), 1);
    }

    #[test]
    fn test_channel_spec_serde_drops_runtime() {
        let mut channel = Channel::new("rtsp://camera.local/main").named("main");
        channel.debug = true;
        channel.run_lock = true;
        channel.status = ChannelStatus::Online;
        channel.sdp = Bytes::from_static(b"v=0");

        let json = serde_json::to_string(&channel).unwrap();
        let restored: Channel = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.url, "rtsp://camera.local/main");
        assert_eq!(restored.name, "main");
        assert!(restored.debug);
        assert!(!restored.run_lock);
        assert_eq!(restored.status, ChannelStatus::Offline);
        assert!(restored.sdp.is_empty());
        assert!(restored.ack < SystemTime::now());
    }
}
