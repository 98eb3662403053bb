use std::fmt;

use bytes::Bytes;

/// How one consumer's attempt to read one frame ended.
///
/// Absence of data is a result in its own right: a relay that drops an
/// invalid frame is observed as [`ReceptionOutcome::Timeout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceptionOutcome {
    /// A whole frame (header + declared body) arrived. Holds the raw bytes.
    CompleteMatch(Bytes),
    /// No complete header arrived before the deadline or the stream ended.
    Timeout,
    /// The stream failed or closed after the header announced more body.
    BrokenConnection(String),
}

impl ReceptionOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, ReceptionOutcome::CompleteMatch(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ReceptionOutcome::Timeout)
    }

    /// Received bytes, if a frame completed.
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            ReceptionOutcome::CompleteMatch(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Short machine-friendly name.
    pub fn label(&self) -> &'static str {
        match self {
            ReceptionOutcome::CompleteMatch(_) => "complete",
            ReceptionOutcome::Timeout => "timeout",
            ReceptionOutcome::BrokenConnection(_) => "broken",
        }
    }
}

impl fmt::Display for ReceptionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceptionOutcome::CompleteMatch(bytes) => write!(f, "complete ({} bytes)", bytes.len()),
            ReceptionOutcome::Timeout => f.write_str("timeout"),
            ReceptionOutcome::BrokenConnection(reason) => write!(f, "broken connection: {reason}"),
        }
    }
}
