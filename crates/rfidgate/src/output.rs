use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rfidgate_frame::{DecodedFrame, TagDetection};
use rfidgate_server::{Message, Reading};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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
struct FrameOutput<'a> {
    device: &'a str,
    address: u8,
    serial: String,
    tags: &'a [TagDetection],
}

#[derive(Serialize)]
pub struct SendSummary<'a> {
    pub addr: &'a str,
    pub frames: usize,
    pub bytes: usize,
}

/// Print one published message. JSON output is the bus payload unchanged.
pub fn print_message(message: &Message, format: OutputFormat) {
    if matches!(format, OutputFormat::Json | OutputFormat::Raw) {
        print_line(message.payload.as_ref());
        return;
    }

    match serde_json::from_slice::<Reading>(&message.payload) {
        Ok(reading) => print_reading(&reading, &message.topic, format),
        Err(err) => {
            tracing::warn!(error = %err, topic = %message.topic, "unexpected payload shape");
            print_line(message.payload.as_ref());
        }
    }
}

fn print_reading(reading: &Reading, topic: &str, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{}", tag_table(&reading.device, &reading.data));
        }
        _ => {
            println!(
                "topic={} device={} tags={} ts={}",
                topic,
                reading.device,
                reading.data.len(),
                reading.ts
            );
            for tag in &reading.data {
                println!("  {} rssi={}", tag.tag, tag.rssi);
            }
        }
    }
}

pub fn print_frame(frame: &DecodedFrame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                device: &frame.device,
                address: frame.address,
                serial: frame.serial_hex(),
                tags: &frame.tags,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            println!("{}", tag_table(&frame.device, &frame.tags));
        }
        OutputFormat::Pretty => {
            println!(
                "device={} address=0x{:02x} serial={} tags={}",
                frame.device,
                frame.address,
                frame.serial_hex(),
                frame.tags.len()
            );
            for tag in &frame.tags {
                println!("  {} rssi={}", tag.tag, tag.rssi);
            }
        }
        OutputFormat::Raw => {
            for tag in &frame.tags {
                println!("{} {}", tag.tag, tag.rssi);
            }
        }
    }
}

pub fn print_send_summary(summary: &SendSummary<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
        ),
        _ => println!(
            "sent {} frame(s), {} bytes to {}",
            summary.frames, summary.bytes, summary.addr
        ),
    }
}

fn tag_table(device: &str, tags: &[TagDetection]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["DEVICE", "TAG", "RSSI"]);
    for tag in tags {
        table.add_row(vec![
            device.to_string(),
            tag.tag.clone(),
            tag.rssi.to_string(),
        ]);
    }
    table
}

fn print_line(data: &[u8]) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(data);
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}
