use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::checksum;
use crate::error::{FrameError, Result};

/// Frame header: magic (1) + options (1) + length (2) + reserved (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// The only magic byte a relay forwards.
pub const MAGIC: u8 = 0xCC;

/// Largest body the 16-bit length field can describe.
pub const MAX_BODY_LEN: usize = u16::MAX as usize;

/// Options bit marking a frame whose bytes 4..6 carry a checksum.
pub const OPTION_SENSITIVE: u8 = 0x40;

/// Default upper bound on a single body read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// A CTMP frame.
///
/// Everything except `magic` and the body length is carried opaquely: the
/// header bytes given at construction are emitted unchanged on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    magic: u8,
    options: u8,
    reserved: [u8; 4],
    body: Bytes,
}

impl Frame {
    /// A valid frame (magic `0xCC`, zeroed opaque fields) around `body`.
    pub fn new(body: impl Into<Bytes>) -> Result<Self> {
        Self::with_header(MAGIC, 0, [0; 4], body)
    }

    /// A frame with every header field chosen by the caller.
    ///
    /// `magic` is not checked here, so fixtures can build frames a relay
    /// must drop.
    pub fn with_header(
        magic: u8,
        options: u8,
        reserved: [u8; 4],
        body: impl Into<Bytes>,
    ) -> Result<Self> {
        let body = body.into();
        check_body_len(body.len())?;
        Ok(Self {
            magic,
            options,
            reserved,
            body,
        })
    }

    /// A valid frame with the sensitive option set and a correct checksum.
    pub fn sensitive(body: impl Into<Bytes>) -> Result<Self> {
        let mut frame = Self::with_header(MAGIC, OPTION_SENSITIVE, [0; 4], body)?;
        let sum = checksum(&frame.to_bytes());
        frame.reserved[..2].copy_from_slice(&sum.to_be_bytes());
        Ok(frame)
    }

    pub fn magic(&self) -> u8 {
        self.magic
    }

    pub fn options(&self) -> u8 {
        self.options
    }

    pub fn reserved(&self) -> [u8; 4] {
        self.reserved
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Value of the length field.
    pub fn length(&self) -> u16 {
        // Bounded by `check_body_len` at construction.
        self.body.len() as u16
    }

    /// Whether a relay should forward this frame.
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    /// Whether the sensitive option bit is set.
    pub fn is_sensitive(&self) -> bool {
        self.options & OPTION_SENSITIVE != 0
    }

    /// The total wire size of this frame (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        put_frame(self, &mut dst);
        dst.freeze()
    }
}

/// Header fields a consumer needs to finish reading a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: u8,
    pub length: u16,
}

impl FrameHeader {
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    /// Bytes on the wire for the whole frame this header announces.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.length as usize
    }
}

/// Encode raw header fields and a body into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────┬─────────┬──────────┬────────────┬───────────────┐
/// │ Magic │ Options │ Length   │ Reserved   │ Body          │
/// │ (1B)  │ (1B)    │ (2B BE)  │ (4B)       │ (Length bytes)│
/// │ 0xCC  │         │          │            │               │
/// └───────┴─────────┴──────────┴────────────┴───────────────┘
/// ```
pub fn encode(magic: u8, options: u8, reserved: [u8; 4], body: &[u8]) -> Result<Bytes> {
    let frame = Frame::with_header(magic, options, reserved, Bytes::copy_from_slice(body))?;
    Ok(frame.to_bytes())
}

/// Append `frame` to `dst` in wire format.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) {
    dst.reserve(frame.wire_size());
    put_frame(frame, dst);
}

/// Extract magic and length from a header. Does not validate the magic.
pub fn decode_header(header: &[u8; HEADER_SIZE]) -> FrameHeader {
    FrameHeader {
        magic: header[0],
        length: u16::from_be_bytes([header[2], header[3]]),
    }
}

/// Parse a buffer holding exactly one frame.
pub fn decode_frame(src: &[u8]) -> Result<Frame> {
    let Some(header) = src.first_chunk::<HEADER_SIZE>() else {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE,
            available: src.len(),
        });
    };

    let parsed = decode_header(header);
    let total = parsed.wire_size();
    if src.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: src.len(),
        });
    }
    if src.len() > total {
        return Err(FrameError::TrailingBytes {
            extra: src.len() - total,
        });
    }

    let reserved = [header[4], header[5], header[6], header[7]];
    Frame::with_header(
        parsed.magic,
        header[1],
        reserved,
        Bytes::copy_from_slice(&src[HEADER_SIZE..]),
    )
}

fn put_frame(frame: &Frame, dst: &mut BytesMut) {
    dst.put_u8(frame.magic);
    dst.put_u8(frame.options);
    dst.put_u16(frame.length());
    dst.put_slice(&frame.reserved);
    dst.put_slice(&frame.body);
}

fn check_body_len(len: usize) -> Result<()> {
    if len > MAX_BODY_LEN {
        return Err(FrameError::InvalidLength {
            len,
            max: MAX_BODY_LEN,
        });
    }
    Ok(())
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Upper bound on a single body read. Default: 1024 bytes.
    pub read_chunk_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
