use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use objlink_frame::{ChannelId, RawDecoder};
use objlink_transport::{ByteSource, IoSource, TransportError};
use tracing::{debug, info, warn};

use crate::cmd::{Context, DecodeArgs};
use crate::exit::{
    frame_error, io_error, transport_error, CliError, CliResult, FAILURE, INTERRUPTED, SUCCESS,
};
use crate::output::{print_payload, print_stats, DecodedPayload};

const IDLE_BACKOFF: Duration = Duration::from_millis(5);
#[cfg(unix)]
const DEVICE_READ_TIMEOUT: Duration = Duration::from_millis(200);

pub fn run(args: DecodeArgs, ctx: &Context) -> CliResult<i32> {
    let channel = ChannelId::new(args.channel).map_err(|err| frame_error("decode", err))?;
    let mut decoder = RawDecoder::with_config(channel, args.size, ctx.config)
        .map_err(|err| frame_error("decode", err))?;
    let mut source = IoSource::new(open_input(&args)?);

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    // First Ctrl-C stops after the current read; a second one exits at once.
    if let Err(err) = ctrlc::set_handler(move || {
        if !handler_flag.swap(false, Ordering::SeqCst) {
            std::process::exit(INTERRUPTED);
        }
    }) {
        warn!(error = %err, "failed to install Ctrl-C handler");
    }

    let decoded = pump(&mut source, &mut decoder, args.count, &running, |index, payload| {
        print_payload(
            &DecodedPayload {
                channel: channel.get(),
                index,
                payload_size: payload.len(),
                payload: hex::encode(payload),
                raw: payload,
            },
            ctx.format,
        );
    })?;

    if args.stats {
        print_stats(channel.get(), &decoder.stats(), ctx.format);
    }

    match args.count {
        Some(wanted) if decoded < wanted => Err(CliError::new(
            FAILURE,
            format!("stream ended after {decoded} of {wanted} payloads"),
        )),
        _ => Ok(SUCCESS),
    }
}

fn open_input(args: &DecodeArgs) -> CliResult<Box<dyn Read>> {
    if let Some(device) = args.device.as_deref() {
        return open_device(device, args.baud);
    }
    match args.input.as_deref() {
        Some(path) => {
            let file = std::fs::File::open(path)
                .map_err(|err| io_error(&format!("failed to open {}", path.display()), err))?;
            debug!(path = %path.display(), "reading frames from file");
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdin().lock())),
    }
}

#[cfg(unix)]
fn open_device(path: &std::path::Path, baud: u32) -> CliResult<Box<dyn Read>> {
    let mut stream = objlink_transport::SerialPort::open(path, baud)
        .map_err(|err| transport_error("failed to open serial device", err))?;
    stream
        .set_read_timeout(Some(DEVICE_READ_TIMEOUT))
        .map_err(|err| transport_error("failed to configure serial device", err))?;
    Ok(Box::new(stream))
}

#[cfg(not(unix))]
fn open_device(path: &std::path::Path, _baud: u32) -> CliResult<Box<dyn Read>> {
    Err(CliError::new(
        crate::exit::USAGE,
        format!("serial devices are not supported on this platform: {}", path.display()),
    ))
}

/// Feed bytes from `source` to `decoder` until the stream closes, `limit`
/// payloads have been decoded or `running` is cleared.
///
/// Returns the number of payloads handed to `on_payload`.
fn pump<S, F>(
    source: &mut S,
    decoder: &mut RawDecoder,
    limit: Option<u64>,
    running: &AtomicBool,
    mut on_payload: F,
) -> CliResult<u64>
where
    S: ByteSource + ?Sized,
    F: FnMut(u64, &[u8]),
{
    let mut decoded = 0u64;
    while running.load(Ordering::SeqCst) {
        if limit.is_some_and(|max| decoded >= max) {
            break;
        }
        match source.read_byte() {
            Ok(Some(byte)) => {
                if let Some(payload) = decoder.step(byte).into_value() {
                    on_payload(decoded, &payload);
                    decoded += 1;
                }
            }
            Ok(None) => std::thread::sleep(IDLE_BACKOFF),
            Err(TransportError::Closed) => break,
            Err(err) => return Err(transport_error("read failed", err)),
        }
    }

    let stats = decoder.stats();
    info!(
        frames = stats.frames,
        foreign = stats.foreign,
        resyncs = stats.resyncs,
        corrupt = stats.corrupt,
        "decode finished"
    );
    Ok(decoded)
}
