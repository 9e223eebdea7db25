//! Packet and codec descriptor types
//!
//! Both packet kinds are cheap to clone: payloads are `bytes::Bytes`, so
//! fan-out to many clients shares one allocation.

use std::time::Duration;

use bytes::Bytes;

/// A protocol-level packet forwarded verbatim to raw-mode clients
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// Wire bytes, opaque to the registry
    pub data: Bytes,
}

impl RawPacket {
    /// Wrap wire bytes in a packet
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

/// A demuxed media packet delivered to decoded-mode clients
#[derive(Debug, Clone)]
pub struct MediaPacket {
    /// Index of the track (codec) this packet belongs to
    pub track: u8,
    /// Whether this packet starts a decodable group (video only)
    pub is_keyframe: bool,
    /// Presentation time since stream start
    pub time: Duration,
    /// Packet duration
    pub duration: Duration,
    /// Encoded payload
    pub data: Bytes,
}

impl MediaPacket {
    /// Create a media packet
    pub fn new(track: u8, is_keyframe: bool, time: Duration, data: impl Into<Bytes>) -> Self {
        Self {
            track,
            is_keyframe,
            time,
            duration: Duration::ZERO,
            data: data.into(),
        }
    }
}

/// Kind of an elementary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    /// Video track
    Video,
    /// Audio track
    Audio,
}

/// Descriptor for one negotiated track.
///
/// Produced by the producer worker after source negotiation; the registry
/// stores the ordered sequence and hands it to consumers, nothing more.
#[derive(Debug, Clone)]
pub struct CodecInfo {
    /// Track kind
    pub kind: CodecKind,
    /// Codec name, e.g. "H264" or "AAC"
    pub name: String,
    /// Decoder configuration record, opaque
    pub extradata: Bytes,
}

impl CodecInfo {
    /// Describe a video track
    pub fn video(name: impl Into<String>, extradata: impl Into<Bytes>) -> Self {
        Self {
            kind: CodecKind::Video,
            name: name.into(),
            extradata: extradata.into(),
        }
    }

    /// Describe an audio track
    pub fn audio(name: impl Into<String>, extradata: impl Into<Bytes>) -> Self {
        Self {
            kind: CodecKind::Audio,
            name: name.into(),
            extradata: extradata.into(),
        }
    }
}
