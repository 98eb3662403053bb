//! TCP endpoint connector for CTMP relays.
//!
//! A relay under test exposes two TCP endpoints: one that accepts the single
//! producer and one that accepts any number of consumers. This crate maps a
//! [`Role`] to its endpoint and hands back a connected [`CtmpStream`] with
//! connect and I/O timeouts applied.
//!
//! This is the lowest layer of the harness. Everything else builds on top of
//! the [`CtmpStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod stream;
pub mod tcp;

pub use endpoint::{
    EndpointConfig, Role, DEFAULT_CONSUMER_PORT, DEFAULT_HOST, DEFAULT_PRODUCER_PORT,
    DEFAULT_TIMEOUT,
};
pub use error::{Result, TransportError};
pub use stream::CtmpStream;
pub use tcp::connect;
