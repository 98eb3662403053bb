use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use ctmp_transport::CtmpStream;
use tracing::debug;

use crate::codec::{encode_frame, Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Writes whole frames to any `Write` stream.
///
/// Each call is one blocking full write followed by a flush. Nothing is
/// retried except writes the OS reports as interrupted; an expired write
/// timeout surfaces as [`FrameError::Io`].
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(HEADER_SIZE),
            config,
        }
    }

    /// Encode and write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        encode_frame(frame, &mut buf);
        let result = self.write_raw(&buf);
        self.buf = buf;
        result
    }

    /// Write already encoded bytes unchanged (blocking).
    ///
    /// Used for fixtures whose header must reach the relay exactly as
    /// given, including frames the relay is expected to drop.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()?;
        debug!(len = bytes.len(), "frame written");
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<CtmpStream> {
    /// Create a frame writer for `CtmpStream` and apply write timeout from config.
    pub fn with_config_ctmp(inner: CtmpStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
