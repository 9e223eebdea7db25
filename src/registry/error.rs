//! Registry error types

use thiserror::Error;

/// Opaque error produced by a configuration store.
///
/// Persistence failures are passed through to the caller unmodified; the
/// registry never inspects them.
pub type PersistError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Error type for registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No stream with the given id is registered.
    ///
    /// Also returned when a codec/SDP readiness wait exhausts its poll
    /// budget; a timed-out wait is indistinguishable from a stream that
    /// never existed.
    #[error("stream not found")]
    StreamNotFound,

    /// The stream exists but has no channel with the given id
    #[error("stream channel not found")]
    ChannelNotFound,

    /// `add` was called with an id that is already registered
    #[error("stream already exists")]
    StreamAlreadyExists,

    /// The configuration store failed to save; in-memory state is kept
    #[error("config persistence failed: {0}")]
    Persist(PersistError),
}

impl RegistryError {
    /// True for the not-found family (stream or channel)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::StreamNotFound | RegistryError::ChannelNotFound
        )
    }
}
