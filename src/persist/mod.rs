//! Stream configuration persistence
//!
//! `add`/`edit`/`delete` call [`ConfigStore::save`] synchronously after
//! mutating the in-memory tree. A save failure is returned to the caller
//! verbatim, but the in-memory change is never rolled back: the stream
//! stays live even when durable state was not updated.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registry::error::PersistError;
use crate::registry::stream::Stream;

/// Durable keeper of the stream configuration.
///
/// Only the static descriptive fields of each channel reach the store;
/// runtime state is stripped by serialization.
pub trait ConfigStore: Send + Sync {
    /// Persist the full stream table
    fn save(&self, streams: &HashMap<String, Stream>) -> Result<(), PersistError>;
}

/// On-disk layout of the configuration file
#[derive(Serialize, Deserialize)]
struct ConfigFile {
    streams: HashMap<String, Stream>,
}

/// JSON file store, one pretty-printed document per save
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the stream table back from disk, e.g. at process startup.
    ///
    /// The returned channels carry spec fields only; feed them through
    /// `StreamRegistry::load` to rebuild runtime state.
    pub fn load(path: impl AsRef<Path>) -> Result<HashMap<String, Stream>, PersistError> {
        let raw = fs::read(path)?;
        let file: ConfigFile = serde_json::from_slice(&raw)?;
        Ok(file.streams)
    }
}

impl ConfigStore for JsonFileStore {
    fn save(&self, streams: &HashMap<String, Stream>) -> Result<(), PersistError> {
        let file = ConfigFile {
            streams: streams.clone(),
        };
        let raw = serde_json::to_vec_pretty(&file)?;
        fs::write(&self.path, raw)?;
        tracing::debug!(path = %self.path.display(), streams = file.streams.len(), "config saved");
        Ok(())
    }
}

/// In-memory store for tests and embedders without a config file.
///
/// Can be armed to fail, to exercise the "memory commits even when the
/// durable save fails" contract.
#[derive(Default)]
pub struct MemoryStore {
    saved: parking_lot::Mutex<HashMap<String, Stream>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail (or succeed again)
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Last successfully saved table
    pub fn snapshot(&self) -> HashMap<String, Stream> {
        self.saved.lock().clone()
    }
}

impl ConfigStore for MemoryStore {
    fn save(&self, streams: &HashMap<String, Stream>) -> Result<(), PersistError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err("simulated store failure".into());
        }
        *self.saved.lock() = streams.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::stream::Channel;

    fn sample_streams() -> HashMap<String, Stream> {
        let stream = Stream::new("lobby")
            .with_channel(0, Channel::new("rtsp://camera.local/main").named("main"))
            .with_channel(1, Channel::new("rtsp://camera.local/sub").on_demand());
        HashMap::from([("cam1".to_string(), stream)])
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streams.json");
        let store = JsonFileStore::new(&path);

        store.save(&sample_streams()).unwrap();
        let restored = JsonFileStore::load(&path).unwrap();

        let stream = &restored["cam1"];
        assert_eq!(stream.name, "lobby");
        assert_eq!(stream.channels.len(), 2);
        assert!(stream.channels[&1].on_demand);
        assert!(!stream.channels[&0].run_lock);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonFileStore::load(dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_memory_store_failure_injection() {
        let store = MemoryStore::new();
        store.save(&sample_streams()).unwrap();
        assert_eq!(store.snapshot().len(), 1);

        store.set_fail(true);
        assert!(store.save(&HashMap::new()).is_err());

        // Failed save leaves the previous snapshot in place
        assert_eq!(store.snapshot().len(), 1);
    }
}
