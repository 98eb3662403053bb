use ctmp_frame::{FrameConfig, FrameReader, ReceptionOutcome};
use ctmp_transport::{connect, EndpointConfig, Role};

use crate::cmd::parse::parse_duration;
use crate::cmd::RecvArgs;
use crate::exit::{frame_error, transport_error, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_outcome, OutputFormat};

pub fn run(args: RecvArgs, format: OutputFormat, endpoints: EndpointConfig) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;

    let stream = connect(Role::Consumer, &endpoints.with_timeout(timeout))
        .map_err(|err| transport_error("connect failed", err))?;
    let config = FrameConfig {
        read_timeout: Some(timeout),
        ..FrameConfig::default()
    };
    let mut reader = FrameReader::with_config_ctmp(stream, config)
        .map_err(|err| frame_error("connect failed", err))?;

    let outcome = reader.read_frame();
    print_outcome(&outcome, format);

    Ok(match outcome {
        ReceptionOutcome::CompleteMatch(_) => SUCCESS,
        ReceptionOutcome::Timeout => TIMEOUT,
        ReceptionOutcome::BrokenConnection(_) => FAILURE,
    })
}
