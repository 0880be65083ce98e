//! Telemetry link example: a controller thread streams state vectors to a
//! monitor over a shared in-memory line with a noisy byte every few frames.
//!
//! Run with:
//!   cargo run --example telemetry-link

use std::thread;
use std::time::Duration;

use objlink::frame::{next_id, Decoder, Encoder, Step};
use objlink::transport::{ByteSink, ByteSource, Loopback};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
struct State {
    tick: u32,
    position: f32,
    velocity: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let channel = next_id()?;
    let line = Loopback::new();

    let mut tx = line.clone();
    let controller = thread::spawn(
        move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let encoder = Encoder::<State>::new(channel);
            for tick in 0..20u32 {
                let state = State {
                    tick,
                    position: tick as f32 * 0.5,
                    velocity: 0.5,
                };
                encoder.emit(&state, &mut tx)?;
                // Line noise.
                if tick % 4 == 3 {
                    tx.write_byte(0x5a)?;
                }
                thread::sleep(Duration::from_millis(2));
            }
            Ok(())
        },
    );

    let mut rx = line;
    let mut decoder = Decoder::<State>::new(channel);
    let mut received = 0;
    while received < 20 {
        let Some(byte) = rx.read_byte()? else {
            if controller.is_finished() && rx.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
            continue;
        };
        match decoder.step(byte) {
            Step::Complete(state) => {
                received += 1;
                eprintln!(
                    "[monitor] tick={} position={:.2} velocity={:.2}",
                    state.tick, state.position, state.velocity
                );
            }
            Step::Corrupt { received: sent, computed } => {
                eprintln!("[monitor] dropped frame: checksum {sent:#06x} != {computed:#06x}");
            }
            _ => {}
        }
    }

    controller
        .join()
        .map_err(|_| "controller thread panicked")?
        .map_err(|e| e.to_string())?;

    eprintln!("[monitor] stats: {:?}", decoder.stats());
    Ok(())
}
