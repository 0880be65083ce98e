mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use objlink_frame::{FrameConfig, SuffixPolicy, DEFAULT_PREFIX, DEFAULT_SUFFIX};

use crate::cmd::{Command, Context};
use crate::exit::{CliError, CliResult, USAGE};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "objlink", version, about = "Checksummed object framing over serial links")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true, env = "OBJLINK_LOG_LEVEL")]
    log_level: LogLevel,

    /// Start-of-frame marker: a character, a decimal byte or 0xNN.
    #[arg(long, value_name = "BYTE", global = true, env = "OBJLINK_PREFIX", value_parser = parse_marker)]
    prefix: Option<u8>,

    /// End-of-payload marker: a character, a decimal byte or 0xNN.
    #[arg(long, value_name = "BYTE", global = true, env = "OBJLINK_SUFFIX", value_parser = parse_marker)]
    suffix: Option<u8>,

    /// Keep waiting for the suffix instead of resynchronizing when it is missing.
    #[arg(long, global = true)]
    stall_on_suffix_mismatch: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn frame_config(&self) -> CliResult<FrameConfig> {
        let config = FrameConfig::new(
            self.prefix.unwrap_or(DEFAULT_PREFIX),
            self.suffix.unwrap_or(DEFAULT_SUFFIX),
        )
        .map_err(|err| CliError::new(USAGE, format!("invalid markers: {err}")))?;

        let policy = if self.stall_on_suffix_mismatch {
            SuffixPolicy::Stall
        } else {
            SuffixPolicy::Resync
        };
        Ok(config.with_suffix_policy(policy))
    }
}

fn parse_marker(input: &str) -> Result<u8, String> {
    if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|err| format!("invalid hex byte: {err}"));
    }
    if input.len() > 1 && input.bytes().all(|b| b.is_ascii_digit()) {
        return input
            .parse::<u8>()
            .map_err(|err| format!("invalid byte: {err}"));
    }
    match input.as_bytes() {
        [b] => Ok(*b),
        _ => Err(format!("expected one character, a byte value or 0xNN, got {input:?}")),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let result = cli.frame_config().and_then(|config| {
        let ctx = Context {
            format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
            config,
        };
        cmd::run(cli.command, &ctx)
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
