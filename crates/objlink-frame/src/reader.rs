use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::codec::Payload;
use crate::decoder::{Decoder, DecoderStats};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Reads decoded values from any `Read` stream.
///
/// Bytes are pulled in chunks and fed to a [`Decoder`]; anything read past
/// the completing frame is kept for the next call.
pub struct FrameReader<R, T> {
    inner: R,
    buf: BytesMut,
    decoder: Decoder<T>,
}

impl<R: Read, T: Payload> FrameReader<R, T> {
    pub fn new(inner: R, decoder: Decoder<T>) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder,
        }
    }

    /// Read the next valid value (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<T> {
        loop {
            if let Some(value) = self.drain_buffer() {
                return Ok(value);
            }

            match self.fill() {
                Ok(()) => {}
                Err(FrameError::Io(err)) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Read the next valid value if one can be completed without blocking.
    ///
    /// Returns `Ok(None)` once the stream reports `WouldBlock`; the partial
    /// frame is kept for the next call.
    pub fn try_read_frame(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(value) = self.drain_buffer() {
                return Ok(Some(value));
            }

            match self.fill() {
                Ok(()) => {}
                Err(FrameError::Io(err)) if err.kind() == ErrorKind::Interrupted => continue,
                Err(FrameError::Io(err)) if err.kind() == ErrorKind::WouldBlock => {
                    return Ok(None)
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn drain_buffer(&mut self) -> Option<T> {
        while self.buf.has_remaining() {
            if let Some(value) = self.decoder.accept(self.buf.get_u8()) {
                return Some(value);
            }
        }
        None
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = self.inner.read(&mut chunk)?;
        if read == 0 {
            return Err(FrameError::ConnectionClosed);
        }
        self.buf.extend_from_slice(&chunk[..read]);
        Ok(())
    }

    /// Counters of the underlying decoder.
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// Borrow the decoder.
    pub fn decoder(&self) -> &Decoder<T> {
        &self.decoder
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::channel::ChannelId;
    use crate::encoder::Encoder;

    fn ch(id: u8) -> ChannelId {
        ChannelId::new(id).unwrap()
    }

    fn wire_of(values: &[u32], id: u8) -> Vec<u8> {
        let encoder = Encoder::<u32>::new(ch(id));
        let mut wire = Vec::new();
        for v in values {
            encoder.emit(v, &mut wire).unwrap();
        }
        wire
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire_of(&[42], 1)), Decoder::<u32>::new(ch(1)));
        assert_eq!(reader.read_frame().unwrap(), 42u32);
    }

    #[test]
    fn read_multiple_frames_from_one_chunk() {
        let wire = wire_of(&[1, 2, 3], 1);
        let mut reader = FrameReader::new(Cursor::new(wire), Decoder::<u32>::new(ch(1)));

        assert_eq!(reader.read_frame().unwrap(), 1);
        assert_eq!(reader.read_frame().unwrap(), 2);
        assert_eq!(reader.read_frame().unwrap(), 3);
        assert_eq!(reader.stats().frames, 3);
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire_of(&[0xDEAD_BEEF], 4),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader, Decoder::<u32>::new(ch(4)));
        assert_eq!(reader.read_frame().unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn skips_other_channels() {
        let mut wire = wire_of(&[10, 11], 2);
        wire.extend(wire_of(&[12], 1));
        let mut reader = FrameReader::new(Cursor::new(wire), Decoder::<u32>::new(ch(1)));
        assert_eq!(reader.read_frame().unwrap(), 12);
        assert_eq!(reader.stats().foreign, 2);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()), Decoder::<u32>::new(ch(1)));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let wire = wire_of(&[5], 1);
        let mut reader = FrameReader::new(
            Cursor::new(wire[..6].to_vec()),
            Decoder::<u32>::new(ch(1)),
        );
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptThenBlock {
            state: 0,
            bytes: wire_of(&[8], 1),
            pos: 0,
            first: ErrorKind::Interrupted,
        };
        let mut framed = FrameReader::new(reader, Decoder::<u32>::new(ch(1)));
        assert_eq!(framed.read_frame().unwrap(), 8);
    }

    #[test]
    fn would_block_propagates_from_blocking_read() {
        let reader = InterruptThenBlock {
            state: 0,
            bytes: wire_of(&[7], 1),
            pos: 0,
            first: ErrorKind::WouldBlock,
        };
        let mut framed = FrameReader::new(reader, Decoder::<u32>::new(ch(1)));
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn try_read_returns_none_on_would_block() {
        let reader = InterruptThenBlock {
            state: 0,
            bytes: wire_of(&[7], 1),
            pos: 0,
            first: ErrorKind::WouldBlock,
        };
        let mut framed = FrameReader::new(reader, Decoder::<u32>::new(ch(1)));
        assert_eq!(framed.try_read_frame().unwrap(), None);
        assert_eq!(framed.try_read_frame().unwrap(), Some(7));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left, Encoder::<u64>::new(ch(9)));
        let mut reader = FrameReader::new(right, Decoder::<u64>::new(ch(9)));

        let sender = std::thread::spawn(move || {
            for i in 0..64u64 {
                writer.send(&(i * 0x0101_0101)).unwrap();
            }
        });

        for i in 0..64u64 {
            assert_eq!(reader.read_frame().unwrap(), i * 0x0101_0101);
        }
        sender.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()), Decoder::<u8>::new(ch(1)));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.decoder().channel().get(), 1);
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptThenBlock {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
        first: ErrorKind,
    }

    impl Read for InterruptThenBlock {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(self.first));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
