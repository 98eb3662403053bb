use std::collections::{BTreeMap, BTreeSet};
use std::net::Shutdown;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ctmp_frame::{FrameWriter, ReceptionOutcome};
use ctmp_transport::{connect, CtmpStream, Role};
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::consumer::{self, ConsumerEvent, ConsumerId, Reception};
use crate::error::{HarnessError, Result};
use crate::scenario::ScenarioSpec;
use crate::verdict::{adjudicate, ScenarioReport};

/// Runs scenarios against a relay: one producer write, N consumers.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one scenario to a report.
    ///
    /// Consumer failures end up in the report. `Err` means the scenario never
    /// got as far as the producer write (or the write itself failed).
    pub fn run(&self, scenario: &ScenarioSpec) -> Result<ScenarioReport> {
        scenario.validate()?;
        let started = Instant::now();
        let mut results: BTreeMap<ConsumerId, Reception> = BTreeMap::new();

        info!(
            scenario = scenario.name(),
            consumers = scenario.consumers(),
            frame_len = scenario.frame().len(),
            expect = %scenario.expect(),
            "scenario starting"
        );

        let producer =
            connect(Role::Producer, &self.config.endpoints).map_err(HarnessError::Producer)?;
        debug!(relay = ?producer.peer_addr().ok(), "producer connected");
        let mut writer =
            FrameWriter::with_config_ctmp(producer, self.config.producer_frame_config())
                .map_err(HarnessError::Write)?;

        let (events_tx, events) = mpsc::channel();
        let mut handles = Vec::with_capacity(scenario.consumers());
        for id in 0..scenario.consumers() {
            let handle = consumer::spawn(
                id,
                self.config.endpoints.clone(),
                self.config.consumer_frame_config(),
                events_tx.clone(),
            );
            match handle {
                Ok(handle) => handles.push((id, handle)),
                Err(err) => {
                    close_producer(writer.get_ref());
                    return Err(HarnessError::Spawn(err));
                }
            }
        }
        drop(events_tx);

        self.await_ready(&events, scenario.consumers(), &mut results);
        thread::sleep(self.config.settle_delay);

        if let Err(err) = writer.write_raw(scenario.frame()) {
            close_producer(writer.get_ref());
            return Err(HarnessError::Write(err));
        }
        debug!(scenario = scenario.name(), "producer write complete");

        let deadline = Instant::now() + self.config.join_timeout;
        collect(&events, scenario.consumers(), deadline, &mut results);
        settle_threads(handles, &mut results);

        let report = adjudicate(scenario, results, started.elapsed());

        close_producer(writer.get_ref());
        thread::sleep(self.config.teardown_pause);

        if report.passed() {
            info!(scenario = %report.scenario, elapsed_ms = report.elapsed_ms, "scenario passed");
        } else {
            warn!(
                scenario = %report.scenario,
                failures = report.failures().count(),
                "scenario failed"
            );
        }
        Ok(report)
    }

    /// Run scenarios one after another, stopping at the first error.
    pub fn run_all(&self, scenarios: &[ScenarioSpec]) -> Result<Vec<ScenarioReport>> {
        scenarios.iter().map(|scenario| self.run(scenario)).collect()
    }

    /// Block until every consumer is ready or finished, or the connect
    /// timeout passes. Early `Finished` events are recorded.
    fn await_ready(
        &self,
        events: &Receiver<ConsumerEvent>,
        count: usize,
        results: &mut BTreeMap<ConsumerId, Reception>,
    ) {
        let deadline = Instant::now() + self.config.endpoints.connect_timeout;
        let mut settled: BTreeSet<ConsumerId> = BTreeSet::new();

        while settled.len() < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match events.recv_timeout(remaining) {
                Ok(ConsumerEvent::Ready(id)) => {
                    settled.insert(id);
                }
                Ok(ConsumerEvent::Finished(id, reception)) => {
                    settled.insert(id);
                    record(results, id, reception);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        ready = settled.len(),
                        expected = count,
                        "not every consumer reported ready; writing anyway"
                    );
                    return;
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
        debug!(consumers = count, "all consumers ready");
    }
}

/// Drain `Finished` events until every consumer has one or `deadline` passes.
fn collect(
    events: &Receiver<ConsumerEvent>,
    count: usize,
    deadline: Instant,
    results: &mut BTreeMap<ConsumerId, Reception>,
) {
    while results.len() < count {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining == Duration::ZERO {
            break;
        }
        match events.recv_timeout(remaining) {
            Ok(ConsumerEvent::Finished(id, reception)) => record(results, id, reception),
            Ok(ConsumerEvent::Ready(_)) => {}
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Join threads that reported; mark the rest as timed out and let them go.
fn settle_threads(
    handles: Vec<(ConsumerId, JoinHandle<()>)>,
    results: &mut BTreeMap<ConsumerId, Reception>,
) {
    for (id, handle) in handles {
        if results.contains_key(&id) {
            if handle.join().is_err() {
                warn!(consumer = id, "consumer thread panicked after reporting");
            }
        } else {
            warn!(consumer = id, "consumer did not report before the join deadline");
            results.insert(id, ReceptionOutcome::Timeout.into());
        }
    }
}

/// First report per consumer wins.
fn record(
    results: &mut BTreeMap<ConsumerId, Reception>,
    id: ConsumerId,
    reception: Reception,
) {
    debug!(
        consumer = id,
        outcome = %reception.outcome,
        received = reception.received,
        "consumer reported"
    );
    results.entry(id).or_insert(reception);
}

fn close_producer(stream: &CtmpStream) {
    if let Err(err) = stream.shutdown(Shutdown::Both) {
        debug!(error = %err, "producer shutdown");
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use bytes::Bytes;
    use ctmp_transport::EndpointConfig;

    use super::*;
    use crate::verdict::Mismatch;

    fn quick_config(producer_port: u16, consumer_port: u16) -> HarnessConfig {
        HarnessConfig::default()
            .with_endpoints(
                EndpointConfig::default()
                    .with_ports(producer_port, consumer_port)
                    .with_timeout(Duration::from_secs(2)),
            )
            .with_read_timeout(Duration::from_millis(500))
            .with_join_timeout(Duration::from_secs(2))
            .with_settle_delay(Duration::from_millis(20))
            .with_teardown_pause(Duration::ZERO)
    }

    #[test]
    fn record_keeps_first_outcome() {
        let mut results = BTreeMap::new();
        record(&mut results, 3, Reception::new(ReceptionOutcome::Timeout, 4));
        record(
            &mut results,
            3,
            ReceptionOutcome::BrokenConnection("late".into()).into(),
        );
        assert_eq!(results[&3], Reception::new(ReceptionOutcome::Timeout, 4));
    }

    #[test]
    fn collect_stops_at_deadline() {
        let (tx, rx) = mpsc::channel();
        tx.send(ConsumerEvent::Finished(0, ReceptionOutcome::Timeout.into()))
            .unwrap();

        let mut results = BTreeMap::new();
        let started = Instant::now();
        collect(
            &rx,
            2,
            Instant::now() + Duration::from_millis(50),
            &mut results,
        );

        assert_eq!(results.len(), 1);
        assert!(started.elapsed() >= Duration::from_millis(50));
        drop(tx);
    }

    #[test]
    fn missing_consumers_become_timeouts() {
        let parked = thread::spawn(|| thread::sleep(Duration::from_millis(10)));
        let done = thread::spawn(|| {});
        let mut results = BTreeMap::new();
        results.insert(
            1,
            ReceptionOutcome::CompleteMatch(Bytes::from_static(b"x")).into(),
        );

        settle_threads(vec![(0, parked), (1, done)], &mut results);

        assert_eq!(results[&0], Reception::new(ReceptionOutcome::Timeout, 0));
        assert!(results[&1].outcome.is_complete());
    }

    #[test]
    fn unreachable_producer_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let harness = Harness::new(quick_config(port, port));
        let scenario = ScenarioSpec::expect_match("offline", Bytes::from_static(b"x"), 1);
        assert!(matches!(
            harness.run(&scenario),
            Err(HarnessError::Producer(_))
        ));
    }

    #[test]
    fn invalid_scenario_is_rejected_before_connecting() {
        let harness = Harness::default();
        let scenario = ScenarioSpec::expect_match("nobody", Bytes::from_static(b"x"), 0);
        assert!(matches!(
            harness.run(&scenario),
            Err(HarnessError::InvalidScenario(_))
        ));
    }

    /// Producer and consumer sides are plain listeners; the test plays relay
    /// by hand and echoes the producer's bytes to the single consumer.
    #[test]
    fn hand_relayed_frame_matches() {
        let producer_side = TcpListener::bind("127.0.0.1:0").unwrap();
        let consumer_side = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = quick_config(
            producer_side.local_addr().unwrap().port(),
            consumer_side.local_addr().unwrap().port(),
        );
        let frame = Bytes::from_static(b"\xCC\x00\x00\x02\x00\x00\x00\x00hi");
        let expected_len = frame.len();

        let relay = thread::spawn(move || {
            let (mut producer, _) = producer_side.accept().unwrap();
            let (mut consumer, _) = consumer_side.accept().unwrap();
            let mut buf = vec![0u8; expected_len];
            producer.read_exact(&mut buf).unwrap();
            consumer.write_all(&buf).unwrap();
        });

        let harness = Harness::new(config);
        let report = harness
            .run(&ScenarioSpec::expect_match("hand", frame, 1))
            .unwrap();
        relay.join().unwrap();

        report.assert_passed();
    }

    #[test]
    fn silent_relay_reports_missing_data() {
        let producer_side = TcpListener::bind("127.0.0.1:0").unwrap();
        let consumer_side = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = quick_config(
            producer_side.local_addr().unwrap().port(),
            consumer_side.local_addr().unwrap().port(),
        );

        let relay = thread::spawn(move || {
            let (_producer, _) = producer_side.accept().unwrap();
            let (_consumer, _) = consumer_side.accept().unwrap();
            thread::sleep(Duration::from_secs(1));
        });

        let harness = Harness::new(config);
        let report = harness
            .run(&ScenarioSpec::expect_match(
                "silent",
                Bytes::from_static(b"\xCC\x00\x00\x00\x00\x00\x00\x00"),
                1,
            ))
            .unwrap();
        relay.join().unwrap();

        assert!(!report.passed());
        assert_eq!(report.verdicts[0].failure, Some(Mismatch::MissingData));
    }
}
