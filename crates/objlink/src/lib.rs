//! Checksummed object framing over serial links.
//!
//! objlink moves fixed-size binary values (setpoints, gains, state vectors)
//! across a byte stream, several logical channels at a time, and recovers
//! from line noise without any handshake.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte sinks and sources (closures, `std::io`, loopback, tty)
//! - [`frame`]: Frame layout, checksum, channel ids, encoder and decoder

/// Re-export transport types.
pub mod transport {
    pub use objlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use objlink_frame::*;
}
