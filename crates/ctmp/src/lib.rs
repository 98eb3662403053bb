//! Conformance harness for CTMP fan-out relays.
//!
//! A CTMP relay accepts framed messages from a producer and copies every
//! valid frame to all connected consumers. This crate bundles the pieces
//! needed to check that behavior from the outside.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP endpoints by role, `CtmpStream`
//! - [`frame`]: frame codec, checksum, single-frame reassembly
//! - [`harness`]: scenarios, fan-out orchestration, reports (behind `harness` feature)

/// Re-export transport types.
pub mod transport {
    pub use ctmp_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ctmp_frame::*;
}

/// Re-export harness types (requires `harness` feature).
#[cfg(feature = "harness")]
pub mod harness {
    pub use ctmp_harness::*;
}
