use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use tracing::debug;

use crate::endpoint::{EndpointConfig, Role};
use crate::error::{Result, TransportError};
use crate::stream::CtmpStream;

/// Connect to the relay endpoint for `role` (blocking).
///
/// Every resolved address is tried once with `config.connect_timeout`; the
/// first that accepts wins. The stream comes back with `config.io_timeout`
/// applied to reads and writes. A failed connect is returned as-is and is
/// never retried.
pub fn connect(role: Role, config: &EndpointConfig) -> Result<CtmpStream> {
    let addr = config.address(role);
    let candidates: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            addr: addr.clone(),
            source,
        })?
        .collect();

    if candidates.is_empty() {
        return Err(TransportError::Resolve {
            addr,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no socket addresses resolved",
            ),
        });
    }

    let mut last_err = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, config.connect_timeout) {
            Ok(stream) => {
                let stream = CtmpStream::from_tcp(stream, role);
                stream.set_read_timeout(config.io_timeout)?;
                stream.set_write_timeout(config.io_timeout)?;
                stream.set_nodelay(true)?;
                debug!(%role, addr = %candidate, "connected to relay endpoint");
                return Ok(stream);
            }
            Err(err) => {
                debug!(%role, addr = %candidate, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(TransportError::Connect {
        addr,
        source: last_err.unwrap_or_else(|| std::io::Error::other("no address accepted")),
    })
}
