use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use objlink_frame::DecoderStats;
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
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Description of a frame produced by `encode`.
#[derive(Serialize)]
pub struct EncodedFrame {
    pub channel: u8,
    pub payload_size: usize,
    pub checksum: u16,
    pub frame: String,
}

/// One payload recovered by `decode`.
#[derive(Serialize)]
pub struct DecodedPayload<'a> {
    pub channel: u8,
    pub index: u64,
    pub payload_size: usize,
    pub payload: String,
    #[serde(skip)]
    pub raw: &'a [u8],
}

#[derive(Serialize)]
struct StatsOutput {
    channel: u8,
    bytes: u64,
    frames: u64,
    foreign: u64,
    resyncs: u64,
    corrupt: u64,
}

pub fn print_encoded(frames: &[EncodedFrame], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for frame in frames {
                println!("{}", to_json(frame));
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["CHANNEL", "SIZE", "CHECKSUM", "FRAME"]);
            for frame in frames {
                table.add_row(vec![
                    frame.channel.to_string(),
                    frame.payload_size.to_string(),
                    format!("0x{:04x}", frame.checksum),
                    frame.frame.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for frame in frames {
                println!(
                    "channel={} size={} checksum=0x{:04x} frame={}",
                    frame.channel, frame.payload_size, frame.checksum, frame.frame
                );
            }
        }
        OutputFormat::Raw => {
            for frame in frames {
                println!("{}", frame.frame);
            }
        }
    }
}

pub fn print_payload(payload: &DecodedPayload<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(payload)),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CHANNEL", "#", "SIZE", "PAYLOAD"]);
            table.add_row(vec![
                payload.channel.to_string(),
                payload.index.to_string(),
                payload.payload_size.to_string(),
                payload.payload.clone(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "channel={} #{} size={} payload={}",
            payload.channel, payload.index, payload.payload_size, payload.payload
        ),
        OutputFormat::Raw => print_raw(payload.raw),
    }
}

pub fn print_stats(channel: u8, stats: &DecoderStats, format: OutputFormat) {
    let out = StatsOutput {
        channel,
        bytes: stats.bytes,
        frames: stats.frames,
        foreign: stats.foreign,
        resyncs: stats.resyncs,
        corrupt: stats.corrupt,
    };
    match format {
        OutputFormat::Json => println!("{}", to_json(&out)),
        OutputFormat::Table => {
            let mut table = new_table(vec!["BYTES", "FRAMES", "FOREIGN", "RESYNCS", "CORRUPT"]);
            table.add_row(vec![
                out.bytes.to_string(),
                out.frames.to_string(),
                out.foreign.to_string(),
                out.resyncs.to_string(),
                out.corrupt.to_string(),
            ]);
            println!("{table}");
        }
        // Raw stdout carries payload bytes only.
        OutputFormat::Pretty | OutputFormat::Raw => eprintln!(
            "channel={} bytes={} frames={} foreign={} resyncs={} corrupt={}",
            out.channel, out.bytes, out.frames, out.foreign, out.resyncs, out.corrupt
        ),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn to_json<S: Serialize>(value: &S) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}
