use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod sysfile;
pub mod throughput;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Measure throughput and delivery between a writer and a reader modem.
    Throughput(ThroughputArgs),
    /// Encode or decode the firmware version system file.
    #[command(subcommand)]
    Sysfile(SysfileCommand),
    /// Print ALP commands received from a modem.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Throughput(args) => throughput::run(args, format),
        Command::Sysfile(command) => sysfile::run(command, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ThroughputArgs {
    /// Number of messages to transmit per trial.
    #[arg(long, short = 'n', default_value = "10")]
    pub msg_count: usize,
    /// Application payload size in bytes.
    #[arg(long, short = 'p', default_value = "50")]
    pub payload_size: usize,
    /// Writer modem (serial device or Unix socket).
    #[arg(long, short = 'w', default_value = "/dev/ttyUSB0")]
    pub serial_writer: PathBuf,
    /// Reader modem (serial device or Unix socket).
    #[arg(long, short = 'R', default_value = "/dev/ttyUSB1")]
    pub serial_reader: PathBuf,
    /// Serial baud rate.
    #[arg(long, short = 'r', default_value = "115200")]
    pub rate: u32,
    /// How long to wait for the reader after the last send (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Subcommand, Debug)]
pub enum SysfileCommand {
    /// Encode a firmware version record to hex.
    Encode(SysfileEncodeArgs),
    /// Decode a firmware version record from hex.
    Decode(SysfileDecodeArgs),
}

#[derive(Args, Debug)]
pub struct SysfileEncodeArgs {
    /// Application name, at most 6 ASCII characters.
    #[arg(long, default_value = "")]
    pub app_name: String,
    /// Abbreviated git commit, at most 7 ASCII characters.
    #[arg(long, default_value = "")]
    pub git_sha1: String,
}

#[derive(Args, Debug)]
pub struct SysfileDecodeArgs {
    /// Record bytes as hex (13 bytes; whitespace ignored).
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Modem endpoint (serial device or Unix socket).
    pub endpoint: PathBuf,
    /// Serial baud rate.
    #[arg(long, short = 'r', default_value = "115200")]
    pub rate: u32,
    /// Exit after receiving N commands.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
