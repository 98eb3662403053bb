use std::fs;

use ctmp_frame::{checksum, Frame, FrameConfig, FrameWriter, OPTION_SENSITIVE};
use ctmp_transport::{connect, EndpointConfig, Role};
use tracing::warn;

use crate::cmd::parse::{parse_byte, parse_duration, parse_hex};
use crate::cmd::SendArgs;
use crate::exit::{frame_error, io_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat, endpoints: EndpointConfig) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let frame = build_frame(&args)?;
    if !frame.is_valid() {
        warn!(magic = frame.magic(), "frame has a foreign magic byte; a relay should drop it");
    }

    let stream = connect(Role::Producer, &endpoints.with_timeout(timeout))
        .map_err(|err| transport_error("connect failed", err))?;
    let config = FrameConfig {
        write_timeout: Some(timeout),
        ..FrameConfig::default()
    };
    let mut writer = FrameWriter::with_config_ctmp(stream, config)
        .map_err(|err| frame_error("connect failed", err))?;

    writer
        .write_frame(&frame)
        .map_err(|err| frame_error("send failed", err))?;

    print_sent(&frame.to_bytes(), format);
    Ok(SUCCESS)
}

fn build_frame(args: &SendArgs) -> CliResult<Frame> {
    let magic = parse_byte(&args.magic)?;
    let body = resolve_body(args)?;
    let options = if args.sensitive { OPTION_SENSITIVE } else { 0 };

    let frame = Frame::with_header(magic, options, [0; 4], body.clone())
        .map_err(|err| frame_error("invalid frame", err))?;
    if !args.sensitive {
        return Ok(frame);
    }

    let [hi, lo] = checksum(&frame.to_bytes()).to_be_bytes();
    Frame::with_header(magic, options, [hi, lo, 0, 0], body)
        .map_err(|err| frame_error("invalid frame", err))
}

fn resolve_body(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --data, --hex or --file is required"))
}
