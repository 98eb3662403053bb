//! Relay endpoint addressing.

use std::fmt;
use std::time::Duration;

/// Default relay host (loopback).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port the relay accepts its producer on.
pub const DEFAULT_PRODUCER_PORT: u16 = 33333;

/// Default port the relay accepts consumers on.
pub const DEFAULT_CONSUMER_PORT: u16 = 44444;

/// Default connect and I/O timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Which side of the relay a connection plays.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Writes frames into the relay.
    Producer,
    /// Receives the relay's broadcast.
    Consumer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the relay lives and how long to wait on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Host name or IP address of the relay.
    pub host: String,
    /// Port for [`Role::Producer`].
    pub producer_port: u16,
    /// Port for [`Role::Consumer`].
    pub consumer_port: u16,
    /// Bound on connection establishment, per resolved address.
    pub connect_timeout: Duration,
    /// Read and write timeout applied to the connected stream.
    /// `None` blocks indefinitely.
    pub io_timeout: Option<Duration>,
}

impl EndpointConfig {
    /// Endpoints on `host` with the default ports and timeouts.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Override both ports.
    pub fn with_ports(mut self, producer_port: u16, consumer_port: u16) -> Self {
        self.producer_port = producer_port;
        self.consumer_port = consumer_port;
        self
    }

    /// Use `timeout` for both connection establishment and stream I/O.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.io_timeout = Some(timeout);
        self
    }

    /// Port for the given role.
    pub fn port(&self, role: Role) -> u16 {
        match role {
            Role::Producer => self.producer_port,
            Role::Consumer => self.consumer_port,
        }
    }

    /// `host:port` string for the given role.
    pub fn address(&self, role: Role) -> String {
        format!("{}:{}", self.host, self.port(role))
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            producer_port: DEFAULT_PRODUCER_PORT,
            consumer_port: DEFAULT_CONSUMER_PORT,
            connect_timeout: DEFAULT_TIMEOUT,
            io_timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}
