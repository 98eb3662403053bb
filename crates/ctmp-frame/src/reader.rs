use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use ctmp_transport::CtmpStream;
use tracing::{debug, trace};

use crate::codec::{decode_header, FrameConfig, HEADER_SIZE};
use crate::error::Result;
use crate::outcome::ReceptionOutcome;

/// Where a consumer is in its single read attempt.
///
/// `Connecting -> ReadingHeader -> ReadingBody -> {Complete | Timeout | Broken}`.
/// Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Connecting,
    ReadingHeader,
    ReadingBody,
    Complete,
    Timeout,
    Broken,
}

impl ConsumerState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConsumerState::Complete | ConsumerState::Timeout | ConsumerState::Broken
        )
    }

    /// Terminal state matching an outcome.
    pub fn for_outcome(outcome: &ReceptionOutcome) -> Self {
        match outcome {
            ReceptionOutcome::CompleteMatch(_) => ConsumerState::Complete,
            ReceptionOutcome::Timeout => ConsumerState::Timeout,
            ReceptionOutcome::BrokenConnection(_) => ConsumerState::Broken,
        }
    }
}

/// Reassembles exactly one frame from any `Read` stream.
///
/// Reads the 8-byte header, then loops over body chunks of at most
/// `read_chunk_size` bytes until the declared length has arrived, however the
/// sender's bytes were segmented. The magic byte is not checked; comparing
/// what arrived against what was sent is the caller's job.
///
/// Every byte taken off the stream is counted, including those of a frame
/// that never completed; see [`FrameReader::bytes_received`].
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
    state: ConsumerState,
    outcome: Option<ReceptionOutcome>,
    bytes_received: usize,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            state: ConsumerState::ReadingHeader,
            outcome: None,
            bytes_received: 0,
        }
    }

    /// Read one frame (blocking) and classify how the attempt ended.
    ///
    /// The first call drives the stream to a terminal state. Later calls
    /// return the same outcome without touching the stream.
    pub fn read_frame(&mut self) -> ReceptionOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let outcome = self.reassemble();
        self.state = ConsumerState::for_outcome(&outcome);
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn reassemble(&mut self) -> ReceptionOutcome {
        self.state = ConsumerState::ReadingHeader;

        let mut header = [0u8; HEADER_SIZE];
        let mut filled = 0usize;
        while filled < HEADER_SIZE {
            match self.inner.read(&mut header[filled..]) {
                Ok(0) => {
                    debug!(received = filled, "stream ended before a full header");
                    return ReceptionOutcome::Timeout;
                }
                Ok(n) => {
                    filled += n;
                    self.bytes_received += n;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => {
                    debug!(received = filled, "timed out waiting for header");
                    return ReceptionOutcome::Timeout;
                }
                Err(err) => {
                    return ReceptionOutcome::BrokenConnection(format!(
                        "header read failed: {err}"
                    ));
                }
            }
        }

        let length = decode_header(&header).length as usize;
        self.state = ConsumerState::ReadingBody;
        debug!(length, magic = header[0], "header received");

        let mut frame = BytesMut::with_capacity(HEADER_SIZE + length);
        frame.extend_from_slice(&header);

        let chunk_size = self.config.read_chunk_size.max(1).min(length.max(1));
        let mut chunk = vec![0u8; chunk_size];
        let mut received = 0usize;
        while received < length {
            let want = (length - received).min(chunk_size);
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => {
                    return ReceptionOutcome::BrokenConnection(format!(
                        "peer closed after {received} of {length} body bytes"
                    ));
                }
                Ok(n) => {
                    frame.extend_from_slice(&chunk[..n]);
                    received += n;
                    self.bytes_received += n;
                    trace!(received, length, "body chunk");
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => {
                    debug!(received, length, "timed out waiting for body");
                    return ReceptionOutcome::Timeout;
                }
                Err(err) => {
                    return ReceptionOutcome::BrokenConnection(format!(
                        "body read failed after {received} of {length} bytes: {err}"
                    ));
                }
            }
        }

        ReceptionOutcome::CompleteMatch(frame.freeze())
    }

    /// Bytes read from the stream so far, header included.
    ///
    /// A `Timeout` outcome with a non-zero count means part of a frame
    /// arrived before the stream went quiet or closed.
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    /// Current position in the read state machine.
    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<CtmpStream> {
    /// Create a frame reader for `CtmpStream` and apply read timeout from config.
    pub fn with_config_ctmp(inner: CtmpStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

// Blocking sockets report an expired SO_RCVTIMEO as WouldBlock on Unix and
// TimedOut on Windows.
fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
