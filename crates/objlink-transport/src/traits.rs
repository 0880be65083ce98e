use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, TransportError};

const READ_CHUNK_SIZE: usize = 256;

/// Destination for outgoing frame bytes, written one at a time and in order.
///
/// Closures taking a `u8` are sinks, so a frame can be pushed straight into
/// a UART register write or a test vector without an adapter.
pub trait ByteSink {
    /// Deliver the next byte.
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Deliver a run of bytes. The default forwards to [`write_byte`](Self::write_byte).
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        bytes.iter().try_for_each(|&b| self.write_byte(b))
    }
}

/// Origin of incoming bytes, polled one at a time.
pub trait ByteSource {
    /// Take the next byte.
    ///
    /// Returns `Ok(None)` when nothing is available right now and
    /// `Err(TransportError::Closed)` once the stream has ended.
    fn read_byte(&mut self) -> Result<Option<u8>>;
}

impl<F: FnMut(u8)> ByteSink for F {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self(byte);
        Ok(())
    }
}

impl ByteSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.push(byte);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl ByteSink for VecDeque<u8> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.push_back(byte);
        Ok(())
    }
}

impl ByteSink for BytesMut {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.put_u8(byte);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.put_slice(bytes);
        Ok(())
    }
}

impl ByteSource for VecDeque<u8> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.pop_front())
    }
}

/// [`ByteSink`] over any `Write` stream.
///
/// Each byte is a single-byte write; wrap the stream in a `BufWriter` when
/// syscall count matters and call [`flush`](IoSink::flush) after a frame.
pub struct IoSink<W> {
    inner: W,
}

impl<W: Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the sink and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for IoSink<W> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }
}

/// [`ByteSource`] over any `Read` stream.
///
/// Reads in small chunks and hands them out a byte at a time. A `WouldBlock`
/// from the stream surfaces as `Ok(None)`; end of stream as
/// [`TransportError::Closed`] once the buffered bytes are drained.
pub struct IoSource<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Number of bytes read from the stream but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the source and return the inner stream. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> Result<bool> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<R: Read> ByteSource for IoSource<R> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.buf.is_empty() && !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.buf.get_u8()))
    }
}
