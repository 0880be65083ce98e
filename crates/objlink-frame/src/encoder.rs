use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use objlink_transport::ByteSink;
use tracing::trace;

use crate::channel::ChannelId;
use crate::checksum::Checksum;
use crate::codec::{encode_frame, frame_len, FrameConfig, Payload};
use crate::error::{FrameError, Result};

/// Frames payloads of a size fixed when the encoder is built.
///
/// The untyped counterpart of [`Encoder`], for callers that only know the
/// payload size at run time.
#[derive(Debug, Clone)]
pub struct RawEncoder {
    channel: ChannelId,
    size: usize,
    config: FrameConfig,
}

impl RawEncoder {
    pub fn new(channel: ChannelId, size: usize) -> Self {
        Self::with_config(channel, size, FrameConfig::default())
    }

    pub fn with_config(channel: ChannelId, size: usize, config: FrameConfig) -> Self {
        Self {
            channel,
            size,
            config,
        }
    }

    /// Write one frame to `sink`, a byte at a time.
    pub fn emit<S: ByteSink + ?Sized>(&self, payload: &[u8], sink: &mut S) -> Result<()> {
        self.check_size(payload)?;
        self.emit_unchecked(payload, sink)
    }

    /// Append one frame to `dst`.
    pub fn encode_to(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        self.check_size(payload)?;
        encode_frame(&self.config, self.channel, payload, dst);
        Ok(())
    }

    /// One frame as an owned buffer.
    pub fn to_bytes(&self, payload: &[u8]) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.frame_len());
        self.encode_to(payload, &mut buf)?;
        Ok(buf.freeze())
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn payload_size(&self) -> usize {
        self.size
    }

    /// Wire size of every frame this encoder produces.
    pub fn frame_len(&self) -> usize {
        frame_len(self.size)
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn check_size(&self, payload: &[u8]) -> Result<()> {
        if payload.len() != self.size {
            return Err(FrameError::PayloadSize {
                expected: self.size,
                actual: payload.len(),
            });
        }
        Ok(())
    }

    fn emit_unchecked<S: ByteSink + ?Sized>(&self, payload: &[u8], sink: &mut S) -> Result<()> {
        let mut sum = Checksum::new();
        sink.write_byte(self.config.prefix())?;
        sink.write_byte(self.channel.get())?;
        for &byte in payload {
            sum.update(byte);
            sink.write_byte(byte)?;
        }
        sink.write_byte(self.config.suffix())?;
        let [lo, hi] = sum.to_le_bytes();
        sink.write_byte(lo)?;
        sink.write_byte(hi)?;
        trace!(
            channel = self.channel.get(),
            len = payload.len(),
            checksum = sum.value(),
            "emitted frame"
        );
        Ok(())
    }
}

/// Frames values of type `T` for one channel.
///
/// Every frame is exactly `size_of::<T>() + 5` bytes. The encoder has no
/// failure of its own; only the sink can fail.
pub struct Encoder<T> {
    raw: RawEncoder,
    _payload: PhantomData<fn(&T)>,
}

impl<T: Payload> Encoder<T> {
    pub fn new(channel: ChannelId) -> Self {
        Self::with_config(channel, FrameConfig::default())
    }

    pub fn with_config(channel: ChannelId, config: FrameConfig) -> Self {
        Self {
            raw: RawEncoder::with_config(channel, std::mem::size_of::<T>(), config),
            _payload: PhantomData,
        }
    }

    /// Write one frame carrying `value` to `sink`.
    pub fn emit<S: ByteSink + ?Sized>(&self, value: &T, sink: &mut S) -> Result<()> {
        self.raw.emit_unchecked(value.as_bytes(), sink)
    }

    /// Append one frame carrying `value` to `dst`.
    pub fn encode_to(&self, value: &T, dst: &mut BytesMut) {
        encode_frame(&self.raw.config, self.raw.channel, value.as_bytes(), dst);
    }

    /// One frame carrying `value` as an owned buffer.
    pub fn to_bytes(&self, value: &T) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.frame_len());
        self.encode_to(value, &mut buf);
        buf.freeze()
    }

    pub fn channel(&self) -> ChannelId {
        self.raw.channel
    }

    pub fn frame_len(&self) -> usize {
        self.raw.frame_len()
    }

    pub fn config(&self) -> &FrameConfig {
        &self.raw.config
    }
}

impl<T> Clone for Encoder<T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Encoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("channel", &self.raw.channel)
            .field("payload_size", &self.raw.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use objlink_transport::{Loopback, TransportError};
    use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

    use super::*;

    fn ch(id: u8) -> ChannelId {
        ChannelId::new(id).unwrap()
    }

    #[test]
    fn emits_reference_bytes_in_order() {
        let encoder = Encoder::<u32>::new(ch(1));
        let mut wire = Vec::new();
        encoder.emit(&0x1234_5678u32.to_le(), &mut wire).unwrap();

        if cfg!(target_endian = "little") {
            assert_eq!(wire, vec![0x61, 0x01, 0x78, 0x56, 0x34, 0x12, 0x7A, 0x14, 0x01]);
        }
        assert_eq!(wire.len(), encoder.frame_len());
    }

    #[test]
    fn closure_sink_receives_one_call_per_byte() {
        let encoder = Encoder::<u16>::new(ch(3));
        let mut calls = 0usize;
        encoder.emit(&0xBEEF, &mut |_b: u8| calls += 1).unwrap();
        assert_eq!(calls, 7);
    }

    #[test]
    fn streamed_and_buffered_forms_agree() {
        let encoder = Encoder::<[u8; 6]>::new(ch(42));
        let value = *b"matrix";
        let mut streamed = Vec::new();
        encoder.emit(&value, &mut streamed).unwrap();
        assert_eq!(encoder.to_bytes(&value).as_ref(), streamed.as_slice());
    }

    #[test]
    fn struct_payload_is_raw_memory() {
        #[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
        #[repr(C)]
        struct Gains {
            kp: f32,
            ki: f32,
            kd: f32,
        }

        let gains = Gains {
            kp: 1.5,
            ki: 0.25,
            kd: -3.0,
        };
        let encoder = Encoder::<Gains>::new(ch(5));
        let frame = encoder.to_bytes(&gains);
        assert_eq!(frame.len(), 12 + 5);
        assert_eq!(&frame[2..14], gains.as_bytes());
    }

    #[test]
    fn raw_encoder_checks_size() {
        let encoder = RawEncoder::new(ch(1), 4);
        let mut out = Vec::new();
        let err = encoder.emit(&[1, 2, 3], &mut out).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadSize {
                expected: 4,
                actual: 3
            }
        ));
        assert!(out.is_empty());

        let frame = encoder.to_bytes(&[0x78, 0x56, 0x34, 0x12]).unwrap();
        assert_eq!(frame.as_ref(), &[0x61, 0x01, 0x78, 0x56, 0x34, 0x12, 0x7A, 0x14, 0x01]);
    }

    #[test]
    fn sink_failure_propagates() {
        struct Broken;
        impl ByteSink for Broken {
            fn write_byte(&mut self, _byte: u8) -> objlink_transport::Result<()> {
                Err(TransportError::Closed)
            }
        }

        let err = Encoder::<u8>::new(ch(1)).emit(&7, &mut Broken).unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Closed)));
    }

    #[test]
    fn writes_into_loopback() {
        let mut line = Loopback::new();
        Encoder::<u8>::new(ch(2)).emit(&0x10, &mut line).unwrap();
        assert_eq!(line.drain(), vec![b'a', 2, 0x10, b'z', 0x10, 0x00]);
    }
}
