//! Registry configuration

use std::time::Duration;

/// Tuning knobs for queue depths and the readiness poll.
///
/// Defaults match the production deployment; tests shrink the queue
/// capacities to exercise the overflow policy cheaply.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Depth of a channel's control-signal queue
    pub signal_queue_capacity: usize,

    /// Depth of a client's control-signal queue
    pub client_signal_capacity: usize,

    /// Depth of each per-client outgoing packet queue
    pub outgoing_queue_capacity: usize,

    /// Sleep between codec/SDP readiness probes
    pub readiness_poll_interval: Duration,

    /// Number of readiness probes before the wait is abandoned
    pub readiness_poll_attempts: u32,

    /// Number of HLS segments kept in a channel's ring
    pub hls_window: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            signal_queue_capacity: 100,
            client_signal_capacity: 10,
            outgoing_queue_capacity: 1000,
            readiness_poll_interval: Duration::from_millis(50),
            readiness_poll_attempts: 100,
            hls_window: 6,
        }
    }
}

impl RegistryConfig {
    /// Set the per-client outgoing queue depth
    pub fn outgoing_queue_capacity(mut self, capacity: usize) -> Self {
        self.outgoing_queue_capacity = capacity;
        self
    }

    /// Set the per-client signal queue depth
    pub fn client_signal_capacity(mut self, capacity: usize) -> Self {
        self.client_signal_capacity = capacity;
        self
    }

    /// Set the channel signal queue depth
    pub fn signal_queue_capacity(mut self, capacity: usize) -> Self {
        self.signal_queue_capacity = capacity;
        self
    }

    /// Set the readiness poll interval
    pub fn readiness_poll_interval(mut self, interval: Duration) -> Self {
        self.readiness_poll_interval = interval;
        self
    }

    /// Set the readiness poll attempt budget
    pub fn readiness_poll_attempts(mut self, attempts: u32) -> Self {
        self.readiness_poll_attempts = attempts;
        self
    }

    /// Set the HLS segment ring window
    pub fn hls_window(mut self, window: usize) -> Self {
        self.hls_window = window;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.signal_queue_capacity, 100);
        assert_eq!(config.client_signal_capacity, 10);
        assert_eq!(config.outgoing_queue_capacity, 1000);
        assert_eq!(config.readiness_poll_interval, Duration::from_millis(50));
        assert_eq!(config.readiness_poll_attempts, 100);
        assert_eq!(config.hls_window, 6);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .outgoing_queue_capacity(4)
            .client_signal_capacity(1)
            .signal_queue_capacity(8)
            .readiness_poll_interval(Duration::from_millis(5))
            .readiness_poll_attempts(3)
            .hls_window(2);

        assert_eq!(config.outgoing_queue_capacity, 4);
        assert_eq!(config.client_signal_capacity, 1);
        assert_eq!(config.signal_queue_capacity, 8);
        assert_eq!(config.readiness_poll_interval, Duration::from_millis(5));
        assert_eq!(config.readiness_poll_attempts, 3);
        assert_eq!(config.hls_window, 2);
    }
}
