/// Errors that stop a scenario before it can be adjudicated.
///
/// Per-consumer failures are not errors; they are recorded as outcomes and
/// judged in the scenario report.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The producer endpoint could not be reached.
    #[error("producer connection failed: {0}")]
    Producer(#[source] ctmp_transport::TransportError),

    /// The single producer write did not complete.
    #[error("producer write failed: {0}")]
    Write(#[source] ctmp_frame::FrameError),

    /// The OS refused to start a consumer thread.
    #[error("failed to spawn consumer thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A fixture frame could not be built.
    #[error("invalid frame fixture: {0}")]
    Frame(#[from] ctmp_frame::FrameError),

    /// The scenario cannot be run as described.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
