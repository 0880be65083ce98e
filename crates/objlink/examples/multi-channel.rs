//! Multi-channel example: two value types share one byte stream and each
//! decoder only reports its own channel.
//!
//! Run with:
//!   cargo run --example multi-channel

use objlink::frame::{Decoder, Encoder, IdAllocator, Step};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ids = IdAllocator::new();
    let setpoint_channel = ids.next_id()?;
    let gains_channel = ids.next_id()?;

    let setpoints = Encoder::<i32>::new(setpoint_channel);
    let gains = Encoder::<[f32; 3]>::new(gains_channel);

    let mut wire = Vec::new();
    for i in 0..3 {
        setpoints.emit(&(i * 100), &mut wire)?;
        gains.emit(&[1.0 + i as f32, 0.1, 0.01], &mut wire)?;
    }
    eprintln!("[wire] {} bytes for 6 frames", wire.len());

    let mut setpoint_rx = Decoder::<i32>::new(setpoint_channel);
    let mut gains_rx = Decoder::<[f32; 3]>::new(gains_channel);

    for &byte in &wire {
        if let Step::Complete(value) = setpoint_rx.step(byte) {
            eprintln!("[channel {setpoint_channel}] setpoint={value}");
        }
        if let Step::Complete(value) = gains_rx.step(byte) {
            eprintln!("[channel {gains_channel}] gains={value:?}");
        }
    }

    eprintln!(
        "[setpoints] {:?}\n[gains] {:?}",
        setpoint_rx.stats(),
        gains_rx.stats()
    );
    Ok(())
}
