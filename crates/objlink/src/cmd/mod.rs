use clap::{Args, Subcommand};
use objlink_frame::FrameConfig;
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod version;

/// Settings shared by every subcommand.
pub struct Context {
    pub format: OutputFormat,
    pub config: FrameConfig,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wrap a payload in a frame.
    Encode(EncodeArgs),
    /// Decode frames for one channel from a byte stream.
    ///
    /// Ctrl-C stops after the read in progress; on an idle stdin that waits
    /// for the next byte, so press Ctrl-C again to exit at once (code 130).
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, ctx),
        Command::Decode(args) => decode::run(args, ctx),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Channel id (1-255).
    #[arg(long, short = 'c', default_value = "1")]
    pub channel: u8,
    /// Payload as hex digits, in wire order.
    #[arg(long, conflicts_with = "text", required_unless_present = "text")]
    pub hex: Option<String>,
    /// Payload as UTF-8 text.
    #[arg(long, conflicts_with = "hex")]
    pub text: Option<String>,
    /// Emit the frame this many times.
    #[arg(long, default_value = "1")]
    pub repeat: usize,
    /// Write the frame bytes to a file instead of describing them.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Channel id to accept (1-255).
    #[arg(long, short = 'c', default_value = "1")]
    pub channel: u8,
    /// Payload size in bytes (at most 16 MiB).
    #[arg(long, short = 's')]
    pub size: usize,
    /// Read the stream from a file. Default: stdin.
    #[arg(long, value_name = "PATH", conflicts_with = "device")]
    pub input: Option<PathBuf>,
    /// Read the stream from a serial device (polled every 200 ms, so Ctrl-C
    /// stops promptly).
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,
    /// Baud rate for --device.
    #[arg(long, default_value = "115200")]
    pub baud: u32,
    /// Exit after decoding N payloads.
    #[arg(long)]
    pub count: Option<u64>,
    /// Print decoder statistics when the stream ends.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
