//! CTMP frame codec and stream reassembly.
//!
//! Every frame is an 8-byte header followed by its body:
//! - 1-byte magic (`0xCC` for frames a relay forwards)
//! - 1-byte options, carried opaquely (`0x40` marks a checksummed frame)
//! - 2-byte big-endian body length
//! - 4 reserved bytes, carried opaquely
//!
//! The codec is pure. [`FrameReader`] turns a live stream into exactly one
//! [`ReceptionOutcome`]; [`FrameWriter`] puts one frame on the wire.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod outcome;
pub mod reader;
pub mod writer;

pub use checksum::{checksum, verify_checksum};
pub use codec::{
    decode_frame, decode_header, encode, encode_frame, Frame, FrameConfig, FrameHeader,
    DEFAULT_READ_CHUNK_SIZE, HEADER_SIZE, MAGIC, MAX_BODY_LEN, OPTION_SENSITIVE,
};
pub use error::{FrameError, Result};
pub use outcome::ReceptionOutcome;
pub use reader::{ConsumerState, FrameReader};
pub use writer::FrameWriter;
