//! Scenario descriptions and the built-in catalogue.

use std::fmt;

use bytes::Bytes;
use ctmp_frame::{encode, Frame, MAGIC};
use serde::Serialize;

use crate::error::{HarnessError, Result};

/// Body length of the `large_packet` fixture.
pub const LARGE_BODY_LEN: usize = 65_000;

/// What every consumer should observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// A byte-identical copy of the sent frame.
    Match,
    /// Nothing at all before the deadline.
    Timeout,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Match => f.write_str("match"),
            Expectation::Timeout => f.write_str("timeout"),
        }
    }
}

/// One producer write observed by `consumers` consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSpec {
    name: String,
    frame: Bytes,
    consumers: usize,
    expect: Expectation,
}

impl ScenarioSpec {
    /// `frame` is sent as-is; it does not have to be a valid CTMP frame.
    pub fn new(
        name: impl Into<String>,
        frame: impl Into<Bytes>,
        consumers: usize,
        expect: Expectation,
    ) -> Self {
        Self {
            name: name.into(),
            frame: frame.into(),
            consumers,
            expect,
        }
    }

    /// Every consumer must receive `frame` unchanged.
    pub fn expect_match(name: impl Into<String>, frame: impl Into<Bytes>, consumers: usize) -> Self {
        Self::new(name, frame, consumers, Expectation::Match)
    }

    /// Every consumer must time out without data.
    pub fn expect_timeout(
        name: impl Into<String>,
        frame: impl Into<Bytes>,
        consumers: usize,
    ) -> Self {
        Self::new(name, frame, consumers, Expectation::Timeout)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes the producer writes.
    pub fn frame(&self) -> &Bytes {
        &self.frame
    }

    pub fn consumers(&self) -> usize {
        self.consumers
    }

    pub fn expect(&self) -> Expectation {
        self.expect
    }

    pub fn validate(&self) -> Result<()> {
        if self.consumers == 0 {
            return Err(HarnessError::InvalidScenario(format!(
                "{}: at least one consumer is required",
                self.name
            )));
        }
        if self.frame.is_empty() {
            return Err(HarnessError::InvalidScenario(format!(
                "{}: frame must not be empty",
                self.name
            )));
        }
        Ok(())
    }
}

/// The reference conformance suite.
pub fn builtin() -> Result<Vec<ScenarioSpec>> {
    let small = Frame::new(Bytes::from_static(b"Hello"))?.to_bytes();
    let large = Frame::new(large_body())?.to_bytes();
    let invalid = encode(0xAB, 0x00, [0; 4], b"Hello")?;
    let basic = Frame::new(Bytes::from_static(b"basic CTMP frame"))?.to_bytes();
    let sensitive = Frame::sensitive(Bytes::from_static(b"Hello, sensitive"))?.to_bytes();

    Ok(vec![
        ScenarioSpec::expect_match("small_packet", small, 1),
        ScenarioSpec::expect_match("large_packet", large, 1),
        ScenarioSpec::expect_timeout("invalid_magic", invalid, 1),
        ScenarioSpec::expect_match("additional_receiver", basic.clone(), 2),
        ScenarioSpec::expect_match("multiple_receivers", basic, 20),
        ScenarioSpec::expect_match("sensitive_packet", sensitive, 1),
    ])
}

/// Look up a built-in scenario by name.
pub fn find(name: &str) -> Result<Option<ScenarioSpec>> {
    Ok(builtin()?.into_iter().find(|scenario| scenario.name() == name))
}

/// Deterministic filler for the large fixture.
fn large_body() -> Bytes {
    (0..LARGE_BODY_LEN)
        .map(|i| (i % 251) as u8 ^ MAGIC)
        .collect::<Vec<u8>>()
        .into()
}
