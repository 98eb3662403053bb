//! ctmp-testkit: an in-process stub relay for harness tests.
//!
//! [`StubRelay`] listens on two ephemeral loopback ports. Every frame a
//! producer sends is checked (magic byte, and checksum for sensitive frames)
//! and then copied to every connected consumer. Invalid frames are dropped.
//! [`RelayOptions`] can make delivery misbehave so the harness's
//! reassembly and failure reporting can be exercised:
//!
//! ```ignore
//! let relay = StubRelay::with_options(RelayOptions {
//!     segment_size: Some(3),
//!     ..RelayOptions::default()
//! })?;
//! let harness = Harness::new(HarnessConfig::default().with_endpoints(relay.endpoints()));
//! ```

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ctmp_frame::{decode_header, verify_checksum, HEADER_SIZE, OPTION_SENSITIVE};
use ctmp_transport::{EndpointConfig, DEFAULT_TIMEOUT};
use tracing::{debug, warn};

const ACCEPT_POLL: Duration = Duration::from_millis(5);
const READ_POLL: Duration = Duration::from_millis(50);
const CONSUMER_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Ways the stub relay can deviate from plain forwarding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayOptions {
    /// Write each copy in pieces of at most this many bytes.
    pub segment_size: Option<usize>,
    /// Pause after each piece when `segment_size` is set.
    pub segment_delay: Duration,
    /// Forward only this many bytes of each frame, then close the
    /// consumer's write side.
    pub truncate_to: Option<usize>,
    /// Forward frames a conforming relay would drop.
    pub forward_invalid: bool,
}

struct Shared {
    options: RelayOptions,
    shutdown: AtomicBool,
    consumers: Mutex<Vec<TcpStream>>,
    forwarded: AtomicUsize,
    dropped: AtomicUsize,
}

impl Shared {
    fn consumers(&self) -> MutexGuard<'_, Vec<TcpStream>> {
        self.consumers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Forget consumers whose peer has hung up.
    fn prune_consumers(&self) -> MutexGuard<'_, Vec<TcpStream>> {
        let mut consumers = self.consumers();
        consumers.retain(|consumer| {
            let open = is_open(consumer);
            if !open {
                debug!("stub relay consumer disconnected");
            }
            open
        });
        consumers
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// A CTMP relay running on background threads until dropped.
pub struct StubRelay {
    producer_addr: SocketAddr,
    consumer_addr: SocketAddr,
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl StubRelay {
    /// Start a relay that forwards valid frames unchanged.
    pub fn start() -> io::Result<Self> {
        Self::with_options(RelayOptions::default())
    }

    pub fn with_options(options: RelayOptions) -> io::Result<Self> {
        let producers = TcpListener::bind("127.0.0.1:0")?;
        let consumers = TcpListener::bind("127.0.0.1:0")?;
        producers.set_nonblocking(true)?;
        consumers.set_nonblocking(true)?;

        let producer_addr = producers.local_addr()?;
        let consumer_addr = consumers.local_addr()?;
        let shared = Arc::new(Shared {
            options,
            shutdown: AtomicBool::new(false),
            consumers: Mutex::new(Vec::new()),
            forwarded: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        });

        let consumer_shared = Arc::clone(&shared);
        let consumer_thread = thread::Builder::new()
            .name("stub-relay-consumers".into())
            .spawn(move || accept_consumers(&consumers, &consumer_shared))?;

        let producer_shared = Arc::clone(&shared);
        let producer_thread = thread::Builder::new()
            .name("stub-relay-producers".into())
            .spawn(move || accept_producers(&producers, &producer_shared))?;

        debug!(%producer_addr, %consumer_addr, "stub relay listening");
        Ok(Self {
            producer_addr,
            consumer_addr,
            shared,
            threads: vec![consumer_thread, producer_thread],
        })
    }

    /// Endpoints pointing at this relay.
    pub fn endpoints(&self) -> EndpointConfig {
        EndpointConfig::new(self.producer_addr.ip().to_string())
            .with_ports(self.producer_addr.port(), self.consumer_addr.port())
            .with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn producer_addr(&self) -> SocketAddr {
        self.producer_addr
    }

    pub fn consumer_addr(&self) -> SocketAddr {
        self.consumer_addr
    }

    /// Consumers currently connected for fan-out.
    pub fn consumer_count(&self) -> usize {
        self.shared.prune_consumers().len()
    }

    /// Frames copied to consumers so far.
    pub fn forwarded(&self) -> usize {
        self.shared.forwarded.load(Ordering::SeqCst)
    }

    /// Frames rejected so far.
    pub fn dropped(&self) -> usize {
        self.shared.dropped.load(Ordering::SeqCst)
    }
}

impl Drop for StubRelay {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        for stream in self.shared.consumers().drain(..) {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

fn accept_consumers(listener: &TcpListener, shared: &Shared) {
    while !shared.is_shutdown() {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(err) = prepare_consumer(&stream) {
                    warn!(%peer, error = %err, "stub relay rejected consumer");
                    continue;
                }
                debug!(%peer, "stub relay consumer connected");
                shared.consumers().push(stream);
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                drop(shared.prune_consumers());
                thread::sleep(ACCEPT_POLL);
            }
            Err(err) => {
                warn!(error = %err, "stub relay consumer accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn prepare_consumer(stream: &TcpStream) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_write_timeout(Some(CONSUMER_WRITE_TIMEOUT))
}

/// Non-blocking peek: EOF or a socket error means the consumer is gone.
/// Unread inbound data still counts as open.
fn is_open(stream: &TcpStream) -> bool {
    if stream.set_nonblocking(true).is_err() {
        return false;
    }
    let mut buf = [0u8; 1];
    let open = match stream.peek(&mut buf) {
        Ok(0) => false,
        Ok(_) => true,
        Err(err) => matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted),
    };
    open && stream.set_nonblocking(false).is_ok()
}

/// Producers are served one at a time on the accepting thread.
fn accept_producers(listener: &TcpListener, shared: &Shared) {
    while !shared.is_shutdown() {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "stub relay producer connected");
                if let Err(err) = serve_producer(stream, shared) {
                    debug!(%peer, error = %err, "stub relay producer finished");
                }
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(err) => {
                warn!(error = %err, "stub relay producer accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn serve_producer(mut stream: TcpStream, shared: &Shared) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(READ_POLL))?;

    loop {
        let mut header = [0u8; HEADER_SIZE];
        read_full(&mut stream, &mut header, shared)?;
        let parsed = decode_header(&header);

        let mut frame = vec![0u8; parsed.wire_size()];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        read_full(&mut stream, &mut frame[HEADER_SIZE..], shared)?;

        if accepts(&frame) || shared.options.forward_invalid {
            broadcast(&frame, shared);
            shared.forwarded.fetch_add(1, Ordering::SeqCst);
        } else {
            debug!(magic = frame[0], len = frame.len(), "stub relay dropped frame");
            shared.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Relay acceptance rule: right magic, and a valid checksum when flagged.
fn accepts(frame: &[u8]) -> bool {
    let Some(header) = frame.first_chunk::<HEADER_SIZE>() else {
        return false;
    };
    decode_header(header).is_valid()
        && (header[1] & OPTION_SENSITIVE == 0 || verify_checksum(frame))
}

/// Fill `buf`, polling so shutdown is noticed. EOF or shutdown is an error.
fn read_full(stream: &mut TcpStream, buf: &mut [u8], shared: &Shared) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(ErrorKind::UnexpectedEof.into()),
            Ok(n) => filled += n,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                if shared.is_shutdown() {
                    return Err(ErrorKind::ConnectionAborted.into());
                }
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn broadcast(frame: &[u8], shared: &Shared) {
    let options = &shared.options;
    let payload = match options.truncate_to {
        Some(limit) => &frame[..limit.min(frame.len())],
        None => frame,
    };

    let mut consumers = shared.prune_consumers();
    consumers.retain_mut(|consumer| {
        let delivered = deliver(consumer, payload, options);
        if let Err(err) = &delivered {
            debug!(error = %err, "stub relay dropping consumer");
            return false;
        }
        if options.truncate_to.is_some() {
            let _ = consumer.shutdown(Shutdown::Write);
            return false;
        }
        true
    });
}

fn deliver(consumer: &mut TcpStream, payload: &[u8], options: &RelayOptions) -> io::Result<()> {
    match options.segment_size {
        Some(size) if size > 0 => {
            for piece in payload.chunks(size) {
                consumer.write_all(piece)?;
                consumer.flush()?;
                if !options.segment_delay.is_zero() {
                    thread::sleep(options.segment_delay);
                }
            }
            Ok(())
        }
        _ => {
            consumer.write_all(payload)?;
            consumer.flush()
        }
    }
}
