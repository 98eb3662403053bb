use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::endpoint::Role;
use crate::error::Result;

/// A connected relay stream. Implements Read + Write.
///
/// This is the I/O type returned by [`crate::connect`]. It remembers which
/// role it was opened for so logs and errors can name it.
pub struct CtmpStream {
    inner: TcpStream,
    role: Role,
}

impl Read for CtmpStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for CtmpStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl CtmpStream {
    /// Wrap an already connected TCP stream.
    pub fn from_tcp(inner: TcpStream, role: Role) -> Self {
        Self { inner, role }
    }

    /// The role this stream was opened for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Disable Nagle so a frame write is not held back waiting for more data.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.inner.set_nodelay(nodelay).map_err(Into::into)
    }

    /// Address of the relay side of the connection.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr().map_err(Into::into)
    }

    /// Address of the local side of the connection.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    /// Shut down one or both halves of the connection.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        self.inner.shutdown(how).map_err(Into::into)
    }
}

impl std::fmt::Debug for CtmpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtmpStream")
            .field("role", &self.role)
            .field("peer", &self.inner.peer_addr().ok())
            .finish()
    }
}
