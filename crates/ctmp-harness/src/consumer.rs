use std::io;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use ctmp_frame::{ConsumerState, FrameConfig, FrameReader, ReceptionOutcome};
use ctmp_transport::{connect, EndpointConfig, Role};
use tracing::{debug, warn};

/// Index of a consumer within one scenario run (`0..consumer_count`).
pub type ConsumerId = usize;

/// How one consumer's read ended and how many bytes it took off the wire.
///
/// `received` counts partial frames too, so a `Timeout` can still carry data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    pub outcome: ReceptionOutcome,
    pub received: usize,
}

impl Reception {
    pub fn new(outcome: ReceptionOutcome, received: usize) -> Self {
        Self { outcome, received }
    }
}

/// Received count taken from the frame itself; zero for anything incomplete.
impl From<ReceptionOutcome> for Reception {
    fn from(outcome: ReceptionOutcome) -> Self {
        let received = outcome.bytes().map_or(0, |bytes| bytes.len());
        Self { outcome, received }
    }
}

/// What a consumer thread reports back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerEvent {
    /// Connected to the relay and about to read.
    Ready(ConsumerId),
    /// Reached a terminal state. Sent exactly once per consumer.
    Finished(ConsumerId, Reception),
}

/// Start one consumer on its own thread.
///
/// The thread connects to the consumer endpoint, reports [`ConsumerEvent::Ready`],
/// reads a single frame, and reports [`ConsumerEvent::Finished`]. Every
/// failure becomes an outcome; nothing escapes the thread. If the receiver is
/// gone by then (the orchestrator gave up waiting) the report is discarded.
pub(crate) fn spawn(
    id: ConsumerId,
    endpoints: EndpointConfig,
    frame_config: FrameConfig,
    events: Sender<ConsumerEvent>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("ctmp-consumer-{id}"))
        .spawn(move || {
            let reception = receive(id, &endpoints, frame_config, &events);
            let _ = events.send(ConsumerEvent::Finished(id, reception));
        })
}

fn receive(
    id: ConsumerId,
    endpoints: &EndpointConfig,
    frame_config: FrameConfig,
    events: &Sender<ConsumerEvent>,
) -> Reception {
    debug!(consumer = id, state = ?ConsumerState::Connecting, "consumer starting");

    let stream = match connect(Role::Consumer, endpoints) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(consumer = id, error = %err, "consumer connect failed");
            return ReceptionOutcome::BrokenConnection(format!("connect failed: {err}")).into();
        }
    };

    let mut reader = match FrameReader::with_config_ctmp(stream, frame_config) {
        Ok(reader) => reader,
        Err(err) => {
            warn!(consumer = id, error = %err, "consumer stream setup failed");
            return ReceptionOutcome::BrokenConnection(format!("stream setup failed: {err}"))
                .into();
        }
    };

    let _ = events.send(ConsumerEvent::Ready(id));
    debug!(
        consumer = id,
        local = ?reader.get_ref().local_addr().ok(),
        state = ?reader.state(),
        "consumer ready"
    );

    let outcome = reader.read_frame();
    let received = reader.bytes_received();
    debug!(consumer = id, state = ?reader.state(), received, %outcome, "consumer finished");
    Reception::new(outcome, received)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;

    fn endpoints_for(listener: &TcpListener) -> EndpointConfig {
        let port = listener.local_addr().unwrap().port();
        EndpointConfig::default()
            .with_ports(port, port)
            .with_timeout(Duration::from_secs(2))
    }

    #[test]
    fn reports_ready_then_finished() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (tx, rx) = mpsc::channel();

        let handle = spawn(7, endpoints_for(&listener), FrameConfig::default(), tx).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            ConsumerEvent::Ready(7)
        );

        let wire = b"\xCC\x00\x00\x02\x00\x00\x00\x00ok";
        server.write_all(wire).unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            ConsumerEvent::Finished(
                7,
                Reception::new(ReceptionOutcome::CompleteMatch(Bytes::from_static(wire)), 10)
            )
        );
        handle.join().unwrap();
    }

    #[test]
    fn connect_failure_is_broken_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoints = endpoints_for(&listener);
        drop(listener);

        let (tx, rx) = mpsc::channel();
        let handle = spawn(0, endpoints, FrameConfig::default(), tx).unwrap();

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            ConsumerEvent::Finished(0, reception) => match reception.outcome {
                ReceptionOutcome::BrokenConnection(reason) => {
                    assert!(reason.starts_with("connect failed"), "{reason}");
                    assert_eq!(reception.received, 0);
                }
                other => panic!("unexpected outcome: {other:?}"),
            },
            other => panic!("unexpected event: {other:?}"),
        }
        handle.join().unwrap();
    }

    #[test]
    fn silent_relay_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (tx, rx) = mpsc::channel();
        let config = FrameConfig {
            read_timeout: Some(Duration::from_millis(100)),
            ..FrameConfig::default()
        };

        let handle = spawn(1, endpoints_for(&listener), config, tx).unwrap();
        let (_server, _) = listener.accept().unwrap();

        assert_eq!(rx.recv().unwrap(), ConsumerEvent::Ready(1));
        assert_eq!(
            rx.recv().unwrap(),
            ConsumerEvent::Finished(1, Reception::new(ReceptionOutcome::Timeout, 0))
        );
        handle.join().unwrap();
    }

    #[test]
    fn partial_frame_then_silence_keeps_byte_count() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (tx, rx) = mpsc::channel();
        let config = FrameConfig {
            read_timeout: Some(Duration::from_millis(100)),
            ..FrameConfig::default()
        };

        let handle = spawn(3, endpoints_for(&listener), config, tx).unwrap();
        let (mut server, _) = listener.accept().unwrap();
        assert_eq!(rx.recv().unwrap(), ConsumerEvent::Ready(3));

        server.write_all(b"\xAB\x00\x00\x05\x00").unwrap();

        assert_eq!(
            rx.recv().unwrap(),
            ConsumerEvent::Finished(3, Reception::new(ReceptionOutcome::Timeout, 5))
        );
        handle.join().unwrap();
    }

    #[test]
    fn dropped_receiver_does_not_panic_thread() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let config = FrameConfig {
            read_timeout: Some(Duration::from_millis(50)),
            ..FrameConfig::default()
        };

        let handle = spawn(2, endpoints_for(&listener), config, tx).unwrap();
        let (_server, _) = listener.accept().unwrap();
        assert!(handle.join().is_ok());
    }
}
