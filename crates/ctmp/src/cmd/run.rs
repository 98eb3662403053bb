use ctmp_harness::{scenario, Harness, HarnessConfig, ScenarioSpec};
use ctmp_transport::EndpointConfig;

use crate::cmd::parse::parse_duration;
use crate::cmd::RunArgs;
use crate::exit::{harness_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_reports, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat, endpoints: EndpointConfig) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let config = HarnessConfig::default()
        .with_endpoints(endpoints.with_timeout(timeout))
        .with_read_timeout(timeout)
        .with_join_timeout(timeout)
        .with_settle_delay(parse_duration(&args.settle)?)
        .with_teardown_pause(parse_duration(&args.teardown)?);

    let scenarios = select(&args.scenario)?;
    let harness = Harness::new(config);

    let mut reports = Vec::with_capacity(scenarios.len());
    for spec in &scenarios {
        let report = harness
            .run(spec)
            .map_err(|err| harness_error(&format!("scenario `{}`", spec.name()), err))?;
        reports.push(report);
    }

    print_reports(&reports, format);

    if reports.iter().all(|report| report.passed()) {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

/// Requested scenarios in the order given, or the whole catalogue.
fn select(names: &[String]) -> CliResult<Vec<ScenarioSpec>> {
    let catalogue = scenario::builtin().map_err(|err| harness_error("catalogue", err))?;
    if names.is_empty() {
        return Ok(catalogue);
    }

    names
        .iter()
        .map(|name| {
            catalogue
                .iter()
                .find(|spec| spec.name() == name)
                .cloned()
                .ok_or_else(|| {
                    CliError::new(
                        USAGE,
                        format!("unknown scenario `{name}` (see `ctmp list`)"),
                    )
                })
        })
        .collect()
}
