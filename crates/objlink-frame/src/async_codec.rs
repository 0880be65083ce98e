use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder as TokioDecoder, Encoder as TokioEncoder};

use crate::channel::ChannelId;
use crate::codec::{FrameConfig, Payload};
use crate::decoder::{Decoder, DecoderStats};
use crate::encoder::Encoder;
use crate::error::FrameError;

/// `tokio_util` codec carrying values of type `T` on one channel.
///
/// Decoding drains every byte handed to it; a partial frame lives in the
/// decoder, not in the read buffer.
#[derive(Debug, Clone)]
pub struct ObjectCodec<T> {
    encoder: Encoder<T>,
    decoder: Decoder<T>,
}

impl<T: Payload> ObjectCodec<T> {
    pub fn new(channel: ChannelId) -> Self {
        Self::with_config(channel, FrameConfig::default())
    }

    pub fn with_config(channel: ChannelId, config: FrameConfig) -> Self {
        Self {
            encoder: Encoder::with_config(channel, config),
            decoder: Decoder::with_config(channel, config),
        }
    }

    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }
}

impl<T: Payload> TokioDecoder for ObjectCodec<T> {
    type Item = T;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.has_remaining() {
            if let Some(value) = self.decoder.accept(src.get_u8()) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

impl<T: Payload> TokioEncoder<T> for ObjectCodec<T> {
    type Error = FrameError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encoder.encode_to(&item, dst);
        Ok(())
    }
}
