use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::Payload;
use crate::encoder::Encoder;
use crate::error::{FrameError, Result};

/// Writes framed values to any `Write` stream.
///
/// Each frame is encoded into an internal buffer and written in full before
/// the stream is flushed, so a frame is never split by a short write.
pub struct FrameWriter<W, T> {
    inner: W,
    buf: BytesMut,
    encoder: Encoder<T>,
}

impl<W: Write, T: Payload> FrameWriter<W, T> {
    pub fn new(inner: W, encoder: Encoder<T>) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(encoder.frame_len()),
            encoder,
        }
    }

    /// Encode and send one value (blocking).
    pub fn send(&mut self, value: &T) -> Result<()> {
        self.buf.clear();
        self.encoder.encode_to(value, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the encoder.
    pub fn encoder(&self) -> &Encoder<T> {
        &self.encoder
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
