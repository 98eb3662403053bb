use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ctmp_frame::{ReceptionOutcome, HEADER_SIZE};
use ctmp_harness::{Expectation, ScenarioReport, ScenarioSpec};
use serde::Serialize;

const PREVIEW_LIMIT: usize = 64;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RunOutput<'a> {
    passed: bool,
    total: usize,
    failed: usize,
    scenarios: &'a [ScenarioReport],
}

pub fn print_reports(reports: &[ScenarioReport], format: OutputFormat) {
    let failed = reports.iter().filter(|report| !report.passed()).count();
    match format {
        OutputFormat::Json => {
            let out = RunOutput {
                passed: failed == 0,
                total: reports.len(),
                failed,
                scenarios: reports,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "SCENARIO",
                    "EXPECT",
                    "CONSUMERS",
                    "RESULT",
                    "ELAPSED",
                    "DETAIL",
                ]);
            for report in reports {
                table.add_row(vec![
                    report.scenario.clone(),
                    report.expect.to_string(),
                    report.consumers.to_string(),
                    verdict_word(report).to_string(),
                    format!("{} ms", report.elapsed_ms),
                    failure_summary(report),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for report in reports {
                println!(
                    "{} {}: {} consumer(s), {} bytes, expect {}, {} ms",
                    verdict_word(report),
                    report.scenario,
                    report.consumers,
                    report.frame_len,
                    report.expect,
                    report.elapsed_ms
                );
                for verdict in report.failures() {
                    if let Some(failure) = &verdict.failure {
                        println!("    consumer {}: {failure}", verdict.consumer);
                    }
                }
            }
            println!(
                "{}/{} scenarios passed",
                reports.len() - failed,
                reports.len()
            );
        }
    }
}

#[derive(Serialize)]
struct CatalogueEntry<'a> {
    name: &'a str,
    consumers: usize,
    expect: Expectation,
    frame_len: usize,
    header: String,
}

pub fn print_catalogue(scenarios: &[ScenarioSpec], format: OutputFormat) {
    let entries: Vec<CatalogueEntry<'_>> = scenarios
        .iter()
        .map(|spec| CatalogueEntry {
            name: spec.name(),
            consumers: spec.consumers(),
            expect: spec.expect(),
            frame_len: spec.frame().len(),
            header: to_hex(&spec.frame()[..HEADER_SIZE.min(spec.frame().len())]),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "CONSUMERS", "BYTES", "EXPECT", "HEADER"]);
            for entry in &entries {
                table.add_row(vec![
                    entry.name.to_string(),
                    entry.consumers.to_string(),
                    entry.frame_len.to_string(),
                    entry.expect.to_string(),
                    entry.header.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for entry in &entries {
                println!(
                    "{:<20} consumers={:<3} bytes={:<6} expect={:<8} header={}",
                    entry.name, entry.consumers, entry.frame_len, entry.expect, entry.header
                );
            }
        }
    }
}

#[derive(Serialize)]
struct OutcomeOutput {
    outcome: &'static str,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

pub fn print_outcome(outcome: &ReceptionOutcome, format: OutputFormat) {
    let bytes = outcome.bytes().map(|bytes| bytes.as_ref());
    let out = OutcomeOutput {
        outcome: outcome.label(),
        size: bytes.map_or(0, <[u8]>::len),
        hex: bytes.map(to_hex),
        body: bytes.map(body_preview),
        reason: match outcome {
            ReceptionOutcome::BrokenConnection(reason) => Some(reason.clone()),
            _ => None,
        },
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OUTCOME", "SIZE", "BODY"])
                .add_row(vec![
                    out.outcome.to_string(),
                    out.size.to_string(),
                    out.body.or(out.reason).unwrap_or_default(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match bytes {
            Some(bytes) => println!("{outcome} body={}", body_preview(bytes)),
            None => println!("{outcome}"),
        },
    }
}

#[derive(Serialize)]
struct SentOutput {
    sent: usize,
    header: String,
    body_len: usize,
}

pub fn print_sent(frame: &[u8], format: OutputFormat) {
    let split = HEADER_SIZE.min(frame.len());
    let out = SentOutput {
        sent: frame.len(),
        header: to_hex(&frame[..split]),
        body_len: frame.len() - split,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SENT", "HEADER", "BODY"])
                .add_row(vec![
                    out.sent.to_string(),
                    out.header,
                    out.body_len.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent {} bytes (header {}, body {} bytes)",
                out.sent, out.header, out.body_len
            );
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn verdict_word(report: &ScenarioReport) -> &'static str {
    if report.passed() {
        "PASS"
    } else {
        "FAIL"
    }
}

fn failure_summary(report: &ScenarioReport) -> String {
    let mut failures = report.failures();
    let Some(first) = failures.next() else {
        return String::new();
    };
    let detail = first
        .failure
        .as_ref()
        .map(|failure| format!("consumer {}: {failure}", first.consumer))
        .unwrap_or_default();
    match failures.count() {
        0 => detail,
        more => format!("{detail} (+{more} more)"),
    }
}

/// Upper-case hex, no separators.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02X}")).collect()
}

fn body_preview(frame: &[u8]) -> String {
    let body = frame.get(HEADER_SIZE..).unwrap_or_default();
    match std::str::from_utf8(body) {
        Ok(text) if text.len() <= PREVIEW_LIMIT => text.to_string(),
        Ok(_) => format!("<text {} bytes>", body.len()),
        Err(_) => format!("<binary {} bytes>", body.len()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use ctmp_harness::{adjudicate, Reception};

    use super::*;

    const HELLO: &[u8] = b"\xCC\x00\x00\x05\x00\x00\x00\x00Hello";

    #[test]
    fn hex_is_upper_case() {
        assert_eq!(to_hex(HELLO), "CC0000050000000048656C6C6F");
    }

    #[test]
    fn preview_shows_short_text_bodies() {
        assert_eq!(body_preview(HELLO), "Hello");
        assert_eq!(
            body_preview(b"\xCC\x00\x00\x02\x00\x00\x00\x00\xFF\xFE"),
            "<binary 2 bytes>"
        );
        assert_eq!(body_preview(b"\xCC"), "");
    }

    #[test]
    fn failure_summary_counts_extra_failures() {
        let spec = ScenarioSpec::expect_match("fan", HELLO.to_vec(), 3);
        let outcomes: BTreeMap<usize, Reception> = (0..3)
            .map(|id| (id, ReceptionOutcome::Timeout.into()))
            .collect();
        let report = adjudicate(&spec, outcomes, Duration::ZERO);

        assert_eq!(
            failure_summary(&report),
            "consumer 0: timed out where a frame was expected (+2 more)"
        );
    }
}
