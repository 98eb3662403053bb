//! Adjudication of per-consumer outcomes against a scenario's expectation.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use ctmp_frame::ReceptionOutcome;
use serde::{Serialize, Serializer};

use crate::consumer::{ConsumerId, Reception};
use crate::scenario::{Expectation, ScenarioSpec};

/// Why one consumer failed its scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    /// A frame arrived but its size differs from what was sent.
    LengthMismatch { expected: usize, actual: usize },
    /// Same size, different bytes. `offset` is the first differing byte.
    ContentMismatch { offset: usize },
    /// Data arrived where the relay should have dropped the frame.
    UnexpectedData { len: usize },
    /// Nothing arrived where a copy of the frame was expected.
    MissingData,
    /// The consumer's connection failed.
    BrokenConnection { reason: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::LengthMismatch { expected, actual } => {
                write!(f, "length mismatch (expected {expected} bytes, got {actual})")
            }
            Mismatch::ContentMismatch { offset } => {
                write!(f, "content mismatch at byte {offset}")
            }
            Mismatch::UnexpectedData { len } => {
                write!(f, "received {len} bytes where a timeout was expected")
            }
            Mismatch::MissingData => f.write_str("timed out where a frame was expected"),
            Mismatch::BrokenConnection { reason } => write!(f, "broken connection: {reason}"),
        }
    }
}

/// One consumer's outcome and whether it satisfied the expectation.
///
/// `received_bytes` counts everything the consumer read, including a
/// partial frame that ended in a timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerVerdict {
    pub consumer: ConsumerId,
    #[serde(serialize_with = "serialize_outcome")]
    pub outcome: ReceptionOutcome,
    pub received_bytes: usize,
    pub failure: Option<Mismatch>,
}

impl ConsumerVerdict {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub expect: Expectation,
    pub consumers: usize,
    pub frame_len: usize,
    pub passed: bool,
    pub elapsed_ms: u128,
    pub verdicts: Vec<ConsumerVerdict>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Verdicts that carry a failure.
    pub fn failures(&self) -> impl Iterator<Item = &ConsumerVerdict> {
        self.verdicts.iter().filter(|verdict| !verdict.passed())
    }

    /// Outcome recorded for `consumer`.
    pub fn outcome(&self, consumer: ConsumerId) -> Option<&ReceptionOutcome> {
        self.verdicts
            .iter()
            .find(|verdict| verdict.consumer == consumer)
            .map(|verdict| &verdict.outcome)
    }

    /// Panic naming every failing consumer.
    #[track_caller]
    pub fn assert_passed(&self) {
        if self.passed {
            return;
        }
        let details: Vec<String> = self
            .failures()
            .filter_map(|verdict| {
                verdict
                    .failure
                    .as_ref()
                    .map(|failure| format!("consumer {}: {failure}", verdict.consumer))
            })
            .collect();
        panic!(
            "scenario `{}` failed (expected {}): {}",
            self.scenario,
            self.expect,
            details.join("; ")
        );
    }
}

/// Judge every consumer's outcome against `scenario`.
///
/// `receptions` must hold one entry per consumer; the orchestrator fills in
/// an empty `Timeout` for consumers it abandoned.
pub fn adjudicate(
    scenario: &ScenarioSpec,
    receptions: BTreeMap<ConsumerId, Reception>,
    elapsed: Duration,
) -> ScenarioReport {
    let verdicts: Vec<ConsumerVerdict> = receptions
        .into_iter()
        .map(|(consumer, reception)| {
            let failure = judge(scenario.frame(), scenario.expect(), &reception);
            ConsumerVerdict {
                consumer,
                received_bytes: reception.received,
                outcome: reception.outcome,
                failure,
            }
        })
        .collect();

    let passed =
        verdicts.len() == scenario.consumers() && verdicts.iter().all(ConsumerVerdict::passed);

    ScenarioReport {
        scenario: scenario.name().to_string(),
        expect: scenario.expect(),
        consumers: scenario.consumers(),
        frame_len: scenario.frame().len(),
        passed,
        elapsed_ms: elapsed.as_millis(),
        verdicts,
    }
}

fn judge(sent: &[u8], expect: Expectation, reception: &Reception) -> Option<Mismatch> {
    match (expect, &reception.outcome) {
        (_, ReceptionOutcome::BrokenConnection(reason)) => Some(Mismatch::BrokenConnection {
            reason: reason.clone(),
        }),
        (Expectation::Match, ReceptionOutcome::CompleteMatch(received)) => compare(sent, received),
        (Expectation::Match, ReceptionOutcome::Timeout) => Some(Mismatch::MissingData),
        // A dropped frame means no bytes at all, not just no complete frame.
        (Expectation::Timeout, ReceptionOutcome::Timeout) => match reception.received {
            0 => None,
            len => Some(Mismatch::UnexpectedData { len }),
        },
        (Expectation::Timeout, ReceptionOutcome::CompleteMatch(received)) => {
            Some(Mismatch::UnexpectedData {
                len: received.len(),
            })
        }
    }
}

fn compare(sent: &[u8], received: &[u8]) -> Option<Mismatch> {
    if sent.len() != received.len() {
        return Some(Mismatch::LengthMismatch {
            expected: sent.len(),
            actual: received.len(),
        });
    }
    sent.iter()
        .zip(received)
        .position(|(a, b)| a != b)
        .map(|offset| Mismatch::ContentMismatch { offset })
}

fn serialize_outcome<S: Serializer>(
    outcome: &ReceptionOutcome,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(outcome.label())
}
