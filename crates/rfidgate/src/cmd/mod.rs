use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use rfidgate_frame::MAX_FRAME_SIZE;
use rfidgate_server::{DEFAULT_LISTEN_ADDR, DEFAULT_TOPIC};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept reader connections and print published readings.
    Serve(ServeArgs),
    /// Act as a reader: send frames to a gateway.
    Send(SendArgs),
    /// Decode frames from a hex string, a capture file or stdin.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "RFID_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen: String,
    /// Quiet period before a burst is published (e.g. 500ms, 2s).
    #[arg(long, env = "RFID_DEBOUNCE", default_value = "500ms")]
    pub debounce: String,
    /// Largest accepted frame in bytes.
    #[arg(long, env = "RFID_MAX_FRAME", default_value_t = MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Topic readings are published on.
    #[arg(long, env = "RFID_TOPIC", default_value = DEFAULT_TOPIC)]
    pub topic: String,
    /// Exit after printing N readings.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Gateway address.
    #[arg(default_value = "127.0.0.1:54329")]
    pub addr: String,
    /// Raw frame bytes as hex, sent unmodified.
    #[arg(long, conflicts_with_all = ["tags", "serial", "address"])]
    pub hex: Option<String>,
    /// Tag to report as HEX:RSSI (repeatable).
    #[arg(long = "tag", value_name = "HEX:RSSI")]
    pub tags: Vec<String>,
    /// Seven-byte reader serial as hex; the first byte is the device id.
    #[arg(long, default_value = "c18323121455ae")]
    pub serial: String,
    /// Reader bus address.
    #[arg(long, default_value_t = 0x08)]
    pub address: u8,
    /// Number of times to send the frame.
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,
    /// Pause between repeats (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex; whitespace is ignored.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Binary capture to decode.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// Largest accepted frame in bytes.
    #[arg(long, default_value_t = MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or bare seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Decode hex, ignoring whitespace so captures can be pasted as-is.
pub fn parse_hex(flag: &str, input: &str) -> CliResult<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact)
        .map_err(|err| CliError::new(USAGE, format!("{flag} is not valid hex: {err}")))
}
