/// Errors that can occur while reaching a relay endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint address did not resolve to any socket address.
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        source: std::io::Error,
    },

    /// Every resolved address refused or timed out the connection.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on an established stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// The underlying I/O error kind.
    pub fn kind(&self) -> std::io::ErrorKind {
        match self {
            TransportError::Resolve { source, .. }
            | TransportError::Connect { source, .. }
            | TransportError::Io(source) => source.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
