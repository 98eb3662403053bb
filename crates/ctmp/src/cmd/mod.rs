use clap::{ArgGroup, Args, Subcommand};
use ctmp_transport::EndpointConfig;
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod list;
mod parse;
pub mod recv;
pub mod run;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run built-in conformance scenarios against the relay.
    Run(RunArgs),
    /// List the built-in scenarios.
    List(ListArgs),
    /// Send a single frame as the producer.
    Send(SendArgs),
    /// Receive a single frame as a consumer.
    Recv(RecvArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, endpoints: EndpointConfig) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format, endpoints),
        Command::List(args) => list::run(args, format),
        Command::Send(args) => send::run(args, format, endpoints),
        Command::Recv(args) => recv::run(args, format, endpoints),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario to run (repeatable). Default: the whole catalogue.
    #[arg(long, short = 's', value_name = "NAME")]
    pub scenario: Vec<String>,
    /// Connect, read and join timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Pause between consumers being ready and the producer write.
    #[arg(long, default_value = "200ms")]
    pub settle: String,
    /// Pause after each scenario so the relay can drop closed sockets.
    #[arg(long, default_value = "500ms")]
    pub teardown: String,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["data", "hex", "file"])))]
pub struct SendArgs {
    /// Body as UTF-8 text.
    #[arg(long)]
    pub data: Option<String>,
    /// Body as hex digits (e.g. 48656c6c6f).
    #[arg(long)]
    pub hex: Option<String>,
    /// Read body from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Magic byte as hex. A relay drops anything but CC.
    #[arg(long, default_value = "CC")]
    pub magic: String,
    /// Set the sensitive option and fill in the checksum.
    #[arg(long)]
    pub sensitive: bool,
    /// Connect and write timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct RecvArgs {
    /// How long to wait for a complete frame (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
