mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use ctmp_transport::{EndpointConfig, DEFAULT_CONSUMER_PORT, DEFAULT_HOST, DEFAULT_PRODUCER_PORT};

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ctmp", version, about = "CTMP relay conformance harness")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Relay host.
    #[arg(long, env = "CTMP_HOST", default_value = DEFAULT_HOST, global = true)]
    host: String,

    /// Relay port for the producer connection.
    #[arg(long, env = "CTMP_PRODUCER_PORT", default_value_t = DEFAULT_PRODUCER_PORT, global = true)]
    producer_port: u16,

    /// Relay port for consumer connections.
    #[arg(long, env = "CTMP_CONSUMER_PORT", default_value_t = DEFAULT_CONSUMER_PORT, global = true)]
    consumer_port: u16,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn endpoints(&self) -> EndpointConfig {
        EndpointConfig::new(self.host.clone()).with_ports(self.producer_port, self.consumer_port)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let endpoints = cli.endpoints();
    let result = cmd::run(cli.command, format, endpoints);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
