//! Fan-out conformance scenarios for CTMP relays.
//!
//! A scenario is one producer write observed by N consumers. The
//! [`Harness`] connects the consumers, waits for them to be ready, writes the
//! frame once, collects every consumer's [`ctmp_frame::ReceptionOutcome`] and
//! judges them against the scenario's [`Expectation`]:
//!
//! ```no_run
//! use ctmp_harness::{scenario, Harness, HarnessConfig};
//!
//! let harness = Harness::new(HarnessConfig::default());
//! for report in harness.run_all(&scenario::builtin()?)? {
//!     println!("{}: {}", report.scenario, if report.passed() { "pass" } else { "FAIL" });
//! }
//! # Ok::<(), ctmp_harness::HarnessError>(())
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod orchestrator;
pub mod scenario;
pub mod verdict;

pub use config::HarnessConfig;
pub use consumer::{ConsumerEvent, ConsumerId, Reception};
pub use error::{HarnessError, Result};
pub use orchestrator::Harness;
pub use scenario::{Expectation, ScenarioSpec};
pub use verdict::{adjudicate, ConsumerVerdict, Mismatch, ScenarioReport};
