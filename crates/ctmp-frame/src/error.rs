/// Errors that can occur during frame encoding, decoding, or writing.
///
/// Reading a frame off a consumer stream never produces one of these; the
/// reader classifies failures into a [`crate::ReceptionOutcome`] instead.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The body does not fit the 16-bit length field.
    #[error("invalid body length ({len} bytes, max {max})")]
    InvalidLength { len: usize, max: usize },

    /// The buffer ends before the frame it announces.
    #[error("truncated frame ({available} of {needed} bytes)")]
    Truncated { needed: usize, available: usize },

    /// The buffer holds more bytes than its header announces.
    #[error("{extra} trailing bytes after frame")]
    TrailingBytes { extra: usize },

    /// An I/O error occurred while writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before the frame was fully written.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl From<ctmp_transport::TransportError> for FrameError {
    fn from(err: ctmp_transport::TransportError) -> Self {
        match err {
            ctmp_transport::TransportError::Io(io)
            | ctmp_transport::TransportError::Connect { source: io, .. }
            | ctmp_transport::TransportError::Resolve { source: io, .. } => FrameError::Io(io),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
