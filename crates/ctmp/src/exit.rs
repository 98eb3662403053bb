use std::fmt;
use std::io;

use ctmp_frame::FrameError;
use ctmp_harness::HarnessError;
use ctmp_transport::TransportError;

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidLength { .. }
        | FrameError::Truncated { .. }
        | FrameError::TrailingBytes { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn harness_error(context: &str, err: HarnessError) -> CliError {
    match err {
        HarnessError::Producer(err) => transport_error(&format!("{context}: producer"), err),
        HarnessError::Write(err) => frame_error(&format!("{context}: producer write"), err),
        HarnessError::Frame(err) => frame_error(context, err),
        HarnessError::InvalidScenario(_) => CliError::new(USAGE, format!("{context}: {err}")),
        HarnessError::Spawn(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_producer_is_transport_error() {
        let err = HarnessError::Producer(TransportError::Connect {
            addr: "127.0.0.1:1".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        });
        let cli = harness_error("scenario `small_packet`", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("scenario `small_packet`: producer"));
    }

    #[test]
    fn connect_timeout_is_timeout() {
        let err = TransportError::Connect {
            addr: "10.255.255.1:33333".to_string(),
            source: io::Error::from(io::ErrorKind::TimedOut),
        };
        assert_eq!(transport_error("connect failed", err).code, TIMEOUT);
    }

    #[test]
    fn oversized_body_is_data_invalid() {
        let err = FrameError::InvalidLength {
            len: 70_000,
            max: 65_535,
        };
        assert_eq!(frame_error("send", err).code, DATA_INVALID);
    }

    #[test]
    fn invalid_scenario_is_usage() {
        let err = HarnessError::InvalidScenario("empty".into());
        assert_eq!(harness_error("run", err).code, USAGE);
    }
}
