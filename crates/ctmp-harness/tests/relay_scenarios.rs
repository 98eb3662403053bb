//! End-to-end scenarios against the in-process stub relay.

use std::net::TcpListener;
use std::time::Duration;

use bytes::Bytes;
use ctmp_frame::{encode, Frame, ReceptionOutcome, MAGIC, OPTION_SENSITIVE};
use ctmp_harness::{scenario, Harness, HarnessConfig, HarnessError, Mismatch, ScenarioSpec};
use ctmp_testkit::{RelayOptions, StubRelay};
use ctmp_transport::EndpointConfig;

fn harness_for(relay: &StubRelay) -> Harness {
    Harness::new(quick(relay.endpoints()))
}

fn quick(endpoints: EndpointConfig) -> HarnessConfig {
    HarnessConfig::default()
        .with_endpoints(endpoints.with_timeout(Duration::from_secs(2)))
        .with_read_timeout(Duration::from_secs(1))
        .with_join_timeout(Duration::from_secs(3))
        .with_settle_delay(Duration::from_millis(100))
        .with_teardown_pause(Duration::from_millis(50))
}

fn builtin(name: &str) -> ScenarioSpec {
    scenario::find(name)
        .expect("catalogue builds")
        .unwrap_or_else(|| panic!("no built-in scenario `{name}`"))
}

#[test]
fn small_packet() {
    let relay = StubRelay::start().unwrap();
    let spec = builtin("small_packet");
    let hex: String = spec.frame().iter().map(|b| format!("{b:02X}")).collect();
    assert_eq!(hex, "CC0000050000000048656C6C6F");

    let report = harness_for(&relay).run(&spec).unwrap();

    report.assert_passed();
    assert_eq!(report.verdicts.len(), 1);
    assert_eq!(report.verdicts[0].received_bytes, 13);
    assert_eq!(relay.forwarded(), 1);
}

#[test]
fn large_packet() {
    let relay = StubRelay::start().unwrap();
    let report = harness_for(&relay).run(&builtin("large_packet")).unwrap();

    report.assert_passed();
    assert_eq!(report.frame_len, 65_008);
}

#[test]
fn invalid_magic_is_dropped() {
    let relay = StubRelay::start().unwrap();
    let report = harness_for(&relay).run(&builtin("invalid_magic")).unwrap();

    report.assert_passed();
    assert_eq!(report.outcome(0), Some(&ReceptionOutcome::Timeout));
    assert_eq!(relay.dropped(), 1);
    assert_eq!(relay.forwarded(), 0);
}

#[test]
fn additional_receiver() {
    let relay = StubRelay::start().unwrap();
    let report = harness_for(&relay)
        .run(&builtin("additional_receiver"))
        .unwrap();

    report.assert_passed();
    assert_eq!(report.verdicts.len(), 2);
}

#[test]
fn multiple_receivers() {
    let relay = StubRelay::start().unwrap();
    let report = harness_for(&relay)
        .run(&builtin("multiple_receivers"))
        .unwrap();

    report.assert_passed();
    assert_eq!(report.verdicts.len(), 20);
    assert!(report.verdicts.iter().all(|v| v.outcome.is_complete()));
}

#[test]
fn sensitive_packet() {
    let relay = StubRelay::start().unwrap();
    let report = harness_for(&relay)
        .run(&builtin("sensitive_packet"))
        .unwrap();
    report.assert_passed();
}

#[test]
fn sensitive_packet_with_bad_checksum_is_dropped() {
    let relay = StubRelay::start().unwrap();
    let harness = harness_for(&relay);
    let bad = encode(MAGIC, OPTION_SENSITIVE, [0; 4], b"Hello").unwrap();

    let report = harness
        .run(&ScenarioSpec::expect_timeout("bad_checksum", bad, 2))
        .unwrap();

    report.assert_passed();
    assert_eq!(relay.dropped(), 1);
}

#[test]
fn segmented_delivery_is_reassembled() {
    let relay = StubRelay::with_options(RelayOptions {
        segment_size: Some(3),
        segment_delay: Duration::from_millis(5),
        ..RelayOptions::default()
    })
    .unwrap();
    let frame = Frame::new(Bytes::from_static(b"split across many segments"))
        .unwrap()
        .to_bytes();

    let report = harness_for(&relay)
        .run(&ScenarioSpec::expect_match("segmented", frame, 3))
        .unwrap();

    report.assert_passed();
}

#[test]
fn large_frame_in_odd_segments() {
    let relay = StubRelay::with_options(RelayOptions {
        segment_size: Some(4_099),
        ..RelayOptions::default()
    })
    .unwrap();
    let harness = Harness::new(quick(relay.endpoints()).with_read_chunk_size(512));

    let report = harness.run(&builtin("large_packet")).unwrap();
    report.assert_passed();
}

#[test]
fn truncated_delivery_is_broken_connection() {
    let relay = StubRelay::with_options(RelayOptions {
        truncate_to: Some(10),
        ..RelayOptions::default()
    })
    .unwrap();

    let report = harness_for(&relay).run(&builtin("small_packet")).unwrap();

    assert!(!report.passed());
    assert!(matches!(
        report.outcome(0),
        Some(ReceptionOutcome::BrokenConnection(_))
    ));
    assert!(matches!(
        report.verdicts[0].failure,
        Some(Mismatch::BrokenConnection { .. })
    ));
}

#[test]
fn header_only_delivery_times_out() {
    let relay = StubRelay::with_options(RelayOptions {
        truncate_to: Some(5),
        ..RelayOptions::default()
    })
    .unwrap();

    let report = harness_for(&relay).run(&builtin("small_packet")).unwrap();

    assert_eq!(report.verdicts[0].failure, Some(Mismatch::MissingData));
    assert_eq!(report.verdicts[0].received_bytes, 5);
}

#[test]
fn dropped_frame_where_match_expected_is_missing_data() {
    let relay = StubRelay::start().unwrap();
    let invalid = builtin("invalid_magic");
    let spec = ScenarioSpec::expect_match("expects_forwarding", invalid.frame().clone(), 2);

    let report = harness_for(&relay).run(&spec).unwrap();

    assert!(!report.passed());
    assert_eq!(report.failures().count(), 2);
    assert!(report
        .verdicts
        .iter()
        .all(|v| v.failure == Some(Mismatch::MissingData)));
}

#[test]
#[should_panic(expected = "consumer 0: timed out where a frame was expected")]
fn assert_passed_reports_missing_data() {
    let relay = StubRelay::start().unwrap();
    let invalid = builtin("invalid_magic");
    let spec = ScenarioSpec::expect_match("expects_forwarding", invalid.frame().clone(), 1);

    harness_for(&relay).run(&spec).unwrap().assert_passed();
}

#[test]
fn forwarding_an_invalid_frame_is_unexpected_data() {
    let relay = StubRelay::with_options(RelayOptions {
        forward_invalid: true,
        ..RelayOptions::default()
    })
    .unwrap();

    let report = harness_for(&relay).run(&builtin("invalid_magic")).unwrap();

    assert!(!report.passed());
    assert_eq!(
        report.verdicts[0].failure,
        Some(Mismatch::UnexpectedData { len: 13 })
    );
}

#[test]
fn partial_forward_of_invalid_frame_is_unexpected_data() {
    let relay = StubRelay::with_options(RelayOptions {
        forward_invalid: true,
        truncate_to: Some(5),
        ..RelayOptions::default()
    })
    .unwrap();

    let report = harness_for(&relay).run(&builtin("invalid_magic")).unwrap();

    assert!(!report.passed());
    assert_eq!(report.outcome(0), Some(&ReceptionOutcome::Timeout));
    assert_eq!(report.verdicts[0].received_bytes, 5);
    assert_eq!(
        report.verdicts[0].failure,
        Some(Mismatch::UnexpectedData { len: 5 })
    );
}

#[test]
fn unreachable_producer_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let harness = Harness::new(quick(EndpointConfig::default().with_ports(port, port)));
    let result = harness.run(&builtin("small_packet"));

    assert!(matches!(result, Err(HarnessError::Producer(_))));
}

#[test]
fn whole_catalogue_passes_in_sequence() {
    let relay = StubRelay::start().unwrap();
    let scenarios = scenario::builtin().unwrap();

    let reports = harness_for(&relay).run_all(&scenarios).unwrap();

    assert_eq!(reports.len(), scenarios.len());
    for report in &reports {
        report.assert_passed();
    }
    assert_eq!(relay.dropped(), 1);
}
