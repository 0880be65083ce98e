//! Byte-level transport abstractions for objlink.
//!
//! The framing layer never touches a device directly. It writes to a
//! [`ByteSink`] one byte at a time and is fed from a [`ByteSource`]:
//! - [`IoSink`] / [`IoSource`] adapt any `std::io` stream
//! - [`Loopback`] is an in-memory FIFO for tests and demos
//! - [`SerialPort`] opens a raw-mode tty (Unix)

pub mod error;
pub mod loopback;
pub mod traits;

#[cfg(unix)]
pub mod tty;

pub use error::{Result, TransportError};
pub use loopback::Loopback;
pub use traits::{ByteSink, ByteSource, IoSink, IoSource};

#[cfg(unix)]
pub use tty::{SerialPort, SerialStream};
