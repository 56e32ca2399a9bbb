use std::net::TcpStream;
use std::thread;

use rfidgate_frame::{FrameWriter, ReaderFrame, TagRecord};

use crate::cmd::{parse_duration, parse_hex, SendArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_send_summary, OutputFormat, SendSummary};

enum Payload {
    Raw(Vec<u8>),
    Frame(ReaderFrame),
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    if args.repeat == 0 {
        return Err(CliError::new(USAGE, "--repeat must be at least 1"));
    }
    let interval = parse_duration(&args.interval)?;
    let payload = resolve_payload(&args)?;

    let stream = TcpStream::connect(&args.addr)
        .map_err(|err| io_error(&format!("connect to {} failed", args.addr), err))?;
    let mut writer = FrameWriter::new(stream);

    let mut bytes = 0usize;
    for i in 0..args.repeat {
        if i > 0 {
            thread::sleep(interval);
        }
        match &payload {
            Payload::Raw(raw) => {
                writer
                    .send_raw(raw)
                    .map_err(|err| frame_error("send failed", err))?;
                bytes += raw.len();
            }
            Payload::Frame(frame) => {
                writer
                    .send(frame)
                    .map_err(|err| frame_error("send failed", err))?;
                bytes += frame.wire_size();
            }
        }
        tracing::debug!(frame = i + 1, "frame sent");
    }

    print_send_summary(
        &SendSummary {
            addr: &args.addr,
            frames: args.repeat,
            bytes,
        },
        format,
    );
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Payload> {
    if let Some(hex) = &args.hex {
        return Ok(Payload::Raw(parse_hex("--hex", hex)?));
    }

    let serial: [u8; 7] = parse_hex("--serial", &args.serial)?
        .try_into()
        .map_err(|_| CliError::new(USAGE, "--serial must be exactly 7 bytes"))?;
    let tags = args
        .tags
        .iter()
        .map(|spec| parse_tag(spec))
        .collect::<CliResult<Vec<_>>>()?;

    Ok(Payload::Frame(ReaderFrame {
        address: args.address,
        ..ReaderFrame::new(serial, tags)
    }))
}

/// Parse `HEX:RSSI`, e.g. `e280116060000217299f4b39:-60`.
fn parse_tag(spec: &str) -> CliResult<TagRecord> {
    let (id, rssi) = spec
        .split_once(':')
        .ok_or_else(|| CliError::new(USAGE, format!("--tag must be HEX:RSSI, got {spec}")))?;
    let id = parse_hex("--tag", id)?;
    if id.is_empty() {
        return Err(CliError::new(USAGE, "--tag id must not be empty"));
    }
    let rssi: i8 = rssi
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("--tag rssi must be -128..=127, got {rssi}")))?;
    Ok(TagRecord::new(id, rssi))
}
