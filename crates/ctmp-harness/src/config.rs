use std::time::Duration;

use ctmp_frame::{FrameConfig, DEFAULT_READ_CHUNK_SIZE};
use ctmp_transport::EndpointConfig;

/// Timing and addressing for scenario runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Relay endpoints. `connect_timeout` also bounds the wait for every
    /// consumer to report ready.
    pub endpoints: EndpointConfig,
    /// Consumer read timeout. A consumer that sees no complete frame within
    /// this window records a timeout.
    pub read_timeout: Duration,
    /// How long after the producer write the orchestrator waits for outcomes.
    pub join_timeout: Duration,
    /// Pause between "all consumers ready" and the producer write, covering
    /// the relay's own accept of the consumer connections.
    pub settle_delay: Duration,
    /// Pause after closing the producer so the relay can tear down sockets
    /// before the next scenario.
    pub teardown_pause: Duration,
    /// Upper bound on a single consumer body read.
    pub read_chunk_size: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            read_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_millis(200),
            teardown_pause: Duration::from_millis(500),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl HarnessConfig {
    pub fn with_endpoints(mut self, endpoints: EndpointConfig) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_teardown_pause(mut self, pause: Duration) -> Self {
        self.teardown_pause = pause;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Frame settings for a consumer stream.
    pub(crate) fn consumer_frame_config(&self) -> FrameConfig {
        FrameConfig {
            read_chunk_size: self.read_chunk_size,
            read_timeout: Some(self.read_timeout),
            write_timeout: None,
        }
    }

    /// Frame settings for the producer stream.
    pub(crate) fn producer_frame_config(&self) -> FrameConfig {
        FrameConfig {
            write_timeout: self.endpoints.io_timeout,
            ..FrameConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_suite() {
        let config = HarnessConfig::default();
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.join_timeout, Duration::from_secs(5));
        assert_eq!(config.teardown_pause, Duration::from_millis(500));
        assert_eq!(config.read_chunk_size, 1024);
        assert_eq!(config.endpoints.producer_port, 33333);
        assert_eq!(config.endpoints.consumer_port, 44444);
    }

    #[test]
    fn consumer_frame_config_carries_read_settings() {
        let config = HarnessConfig::default()
            .with_read_timeout(Duration::from_millis(750))
            .with_read_chunk_size(64);
        let frame = config.consumer_frame_config();
        assert_eq!(frame.read_timeout, Some(Duration::from_millis(750)));
        assert_eq!(frame.read_chunk_size, 64);
        assert_eq!(frame.write_timeout, None);
    }

    #[test]
    fn producer_frame_config_uses_endpoint_io_timeout() {
        let endpoints = EndpointConfig::default().with_timeout(Duration::from_secs(2));
        let config = HarnessConfig::default().with_endpoints(endpoints);
        assert_eq!(
            config.producer_frame_config().write_timeout,
            Some(Duration::from_secs(2))
        );
    }
}
