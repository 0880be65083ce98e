//! Checksummed fixed-size object framing with channel multiplexing.
//!
//! This is the core of objlink. Every value travels as one frame:
//! - A 1-byte prefix marker (`'a'` by default)
//! - A 1-byte channel id (1-255) for multiplexing
//! - The value's raw bytes, `size_of::<T>()` of them
//! - A 1-byte suffix marker (`'z'` by default)
//! - A 2-byte little-endian additive checksum of the payload
//!
//! The [`Decoder`] is driven one byte at a time and resynchronizes on its
//! own after garbage or corruption; there is no error path for bad input.

pub mod channel;
pub mod checksum;
pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use channel::{next_id, ChannelId, IdAllocator, MAX_CHANNELS};
pub use codec::{
    encode_frame, frame_len, FrameConfig, Payload, SuffixPolicy, DEFAULT_PREFIX, DEFAULT_SUFFIX,
    MAX_RAW_PAYLOAD, OVERHEAD,
};
pub use decoder::{Decoder, DecoderStats, RawDecoder, Stage, Step};
pub use encoder::{Encoder, RawEncoder};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::ObjectCodec;
