//! In-process relay demo: one synthetic producer, two consumers
//!
//! Run with: cargo run --example simple_relay
//!
//! A producer worker is spawned through the registry, reports codecs,
//! casts a short burst of media packets and exits; a decoded-mode and a
//! raw-mode consumer register and drain their queues. Everything is
//! in-memory; there is no network I/O here.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use streamhub_rs::{
    Channel, ClientMode, CodecInfo, ConnectionHandle, MediaPacket, MemoryStore, ProducerSpawner,
    RawPacket, Stream, StreamRegistry, StreamSignal,
};

/// Stand-in for a network connection; eviction would close this
struct DemoConn;

impl ConnectionHandle for DemoConn {
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

async fn producer(registry: Arc<StreamRegistry>, stream_id: String, channel_id: u32) {
    let mut signals = registry
        .take_signals(&stream_id, channel_id)
        .await
        .expect("signal queue already claimed");

    registry
        .update_codecs(
            &stream_id,
            channel_id,
            vec![CodecInfo::video("H264", Bytes::new())],
            Bytes::from_static(b"v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n"),
        )
        .await;

    for i in 0..20u64 {
        if let Ok(signal) = signals.try_recv() {
            tracing::info!(?signal, "producer observed signal, exiting");
            break;
        }
        let time = Duration::from_millis(i * 40);
        registry
            .cast(
                &stream_id,
                channel_id,
                MediaPacket::new(0, i % 10 == 0, time, Bytes::from(vec![0u8; 128])),
            )
            .await;
        registry
            .cast_raw(
                &stream_id,
                channel_id,
                RawPacket::new(Bytes::from(vec![0u8; 64])),
            )
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    registry
        .unlock(&stream_id, channel_id)
        .await
        .expect("channel vanished under producer");
    tracing::info!(stream = %stream_id, channel = channel_id, "producer done");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,streamhub_rs=debug".into()),
        )
        .init();

    // Producer workers are handed a registry handle once it exists
    let (spawn_tx, mut spawn_rx) = mpsc::unbounded_channel::<(String, u32)>();
    let spawner: Arc<dyn ProducerSpawner> = Arc::new(move |stream_id: &str, channel_id: u32| {
        let _ = spawn_tx.send((stream_id.to_string(), channel_id));
    });

    let registry = Arc::new(StreamRegistry::new(Arc::new(MemoryStore::new()), spawner));
    {
        let registry = registry.clone();
        tokio::spawn(async move {
            while let Some((stream_id, channel_id)) = spawn_rx.recv().await {
                tokio::spawn(producer(registry.clone(), stream_id, channel_id));
            }
        });
    }

    let stream = Stream::new("demo").with_channel(0, Channel::new("synthetic://pattern"));
    registry.add("cam1", stream).await.expect("add stream");

    // Wait for negotiation the same way a real consumer would
    let codecs = registry.codecs("cam1", 0).await.expect("codecs ready");
    tracing::info!(tracks = codecs.len(), "stream ready");

    let (decoded_id, mut decoded) = registry
        .client_add("cam1", 0, ClientMode::Decoded, Arc::new(DemoConn))
        .await
        .expect("register decoded client");
    let (raw_id, mut raw) = registry
        .client_add("cam1", 0, ClientMode::Raw, Arc::new(DemoConn))
        .await
        .expect("register raw client");

    let mut media_packets = 0usize;
    let mut raw_packets = 0usize;
    let deadline = tokio::time::sleep(Duration::from_secs(2));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            Some(packet) = decoded.media.recv() => {
                media_packets += 1;
                if packet.is_keyframe {
                    tracing::debug!(time = ?packet.time, "keyframe");
                }
            }
            Some(_) = raw.raw.recv() => raw_packets += 1,
            Some(StreamSignal::Stop) = decoded.signals.recv() => break,
            () = &mut deadline => break,
        }
    }

    registry.client_delete("cam1", 0, &decoded_id).await;
    registry.client_delete("cam1", 0, &raw_id).await;
    tracing::info!(media_packets, raw_packets, "demo finished");
}
