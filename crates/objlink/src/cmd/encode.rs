use std::path::Path;

use bytes::BytesMut;
use objlink_frame::{checksum, ChannelId, RawEncoder};
use tracing::info;

use crate::cmd::{Context, EncodeArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_encoded, print_raw, EncodedFrame, OutputFormat};

/// Upper bound on the bytes one invocation writes.
const MAX_OUTPUT: usize = 64 * 1024 * 1024;

pub fn run(args: EncodeArgs, ctx: &Context) -> CliResult<i32> {
    let payload = payload_bytes(&args)?;
    let channel = ChannelId::new(args.channel).map_err(|err| frame_error("encode", err))?;
    let encoder = RawEncoder::with_config(channel, payload.len(), ctx.config);

    let total = encoder
        .frame_len()
        .checked_mul(args.repeat)
        .filter(|&total| total <= MAX_OUTPUT)
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!(
                    "{} frames of {} bytes exceed the {MAX_OUTPUT}-byte output limit",
                    args.repeat,
                    encoder.frame_len()
                ),
            )
        })?;

    let mut wire = BytesMut::with_capacity(total);
    for _ in 0..args.repeat {
        encoder
            .encode_to(&payload, &mut wire)
            .map_err(|err| frame_error("encode", err))?;
    }

    if let Some(path) = args.out.as_deref() {
        write_file(path, &wire)?;
        info!(
            path = %path.display(),
            frames = args.repeat,
            bytes = wire.len(),
            "wrote frames"
        );
        return Ok(SUCCESS);
    }

    if matches!(ctx.format, OutputFormat::Raw) {
        print_raw(&wire);
        return Ok(SUCCESS);
    }

    let frame = hex::encode(&wire[..encoder.frame_len().min(wire.len())]);
    let described: Vec<EncodedFrame> = (0..args.repeat)
        .map(|_| EncodedFrame {
            channel: channel.get(),
            payload_size: payload.len(),
            checksum: checksum::compute(&payload),
            frame: frame.clone(),
        })
        .collect();
    print_encoded(&described, ctx.format);

    Ok(SUCCESS)
}

fn payload_bytes(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    match (&args.hex, &args.text) {
        (Some(digits), _) => decode_hex(digits),
        (None, Some(text)) => Ok(text.as_bytes().to_vec()),
        (None, None) => Err(CliError::new(USAGE, "one of --hex or --text is required")),
    }
}

fn decode_hex(digits: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = digits
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&cleaned)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex payload: {err}")))
}

fn write_file(path: &Path, wire: &[u8]) -> CliResult<()> {
    std::fs::write(path, wire)
        .map_err(|err| io_error(&format!("failed to write {}", path.display()), err))
}

#[cfg(test)]
mod tests {
    use objlink_frame::FrameConfig;

    use super::*;

    fn args(hex: Option<&str>, text: Option<&str>) -> EncodeArgs {
        EncodeArgs {
            channel: 1,
            hex: hex.map(str::to_string),
            text: text.map(str::to_string),
            repeat: 1,
            out: None,
        }
    }

    #[test]
    fn hex_payload_accepts_separators() {
        assert_eq!(decode_hex("78:56 34 12").unwrap(), vec![0x78, 0x56, 0x34, 0x12]);
        assert_eq!(decode_hex("0xbeef").unwrap(), vec![0xbe, 0xef]);
    }

    #[test]
    fn bad_hex_is_data_invalid() {
        assert_eq!(decode_hex("abc").unwrap_err().code, DATA_INVALID);
        assert_eq!(decode_hex("zz").unwrap_err().code, DATA_INVALID);
    }

    #[test]
    fn text_payload_is_utf8_bytes() {
        assert_eq!(payload_bytes(&args(None, Some("hi"))).unwrap(), b"hi".to_vec());
    }

    #[test]
    fn channel_zero_is_a_usage_error() {
        let mut bad = args(Some("00"), None);
        bad.channel = 0;
        let ctx = Context {
            format: OutputFormat::Json,
            config: FrameConfig::default(),
        };
        assert_eq!(run(bad, &ctx).unwrap_err().code, USAGE);
    }

    #[test]
    fn oversized_repeat_is_a_usage_error() {
        let ctx = Context {
            format: OutputFormat::Json,
            config: FrameConfig::default(),
        };
        let mut overflowing = args(Some("00"), None);
        overflowing.repeat = usize::MAX;
        assert_eq!(run(overflowing, &ctx).unwrap_err().code, USAGE);

        let mut too_much = args(Some("00"), None);
        too_much.repeat = MAX_OUTPUT / 6 + 1;
        assert_eq!(run(too_much, &ctx).unwrap_err().code, USAGE);
    }

    #[test]
    fn writes_repeated_frames_to_file() {
        let dir = std::env::temp_dir().join(format!("objlink-encode-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frames.bin");

        let mut a = args(Some("78563412"), None);
        a.repeat = 2;
        a.out = Some(path.clone());
        let ctx = Context {
            format: OutputFormat::Json,
            config: FrameConfig::default(),
        };
        assert_eq!(run(a, &ctx).unwrap(), SUCCESS);

        let frame = [0x61, 0x01, 0x78, 0x56, 0x34, 0x12, 0x7A, 0x14, 0x01];
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, [frame, frame].concat());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
