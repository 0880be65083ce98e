//! Incremental frame decoder.
//!
//! A decoder is fed every byte of a stream, one call per byte, and keeps
//! its position between calls. It never fails: anything that does not look
//! like a valid frame for its channel is dropped and the decoder goes back
//! to scanning for a prefix.
//!
//! ```text
//!  WaitPrefix ──prefix──▶ WaitId ──own id──▶ ReadPayload ──S bytes──▶ WaitSuffix
//!      ▲                    │                                            │
//!      │◀──── other id ─────┘                                         suffix
//!      │                                                                 ▼
//!      │◀───── checksum hi (value if sum matches) ── ReadChecksumHi ◀── ReadChecksumLo
//! ```
//!
//! Several decoders with different ids can watch the same stream; each
//! decides on its own which frames are its.

use std::marker::PhantomData;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::channel::ChannelId;
use crate::checksum;
use crate::codec::{FrameConfig, Payload, SuffixPolicy, MAX_RAW_PAYLOAD};
use crate::error::{FrameError, Result};

/// Position of the decoder within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    WaitPrefix,
    WaitId,
    ReadPayload,
    WaitSuffix,
    ReadChecksumLo,
    ReadChecksumHi,
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// Byte consumed; frame not finished (or nothing to finish).
    Pending,
    /// A frame for another channel started; the decoder went back to
    /// scanning. The id byte itself is dropped, even if it equals the prefix.
    Foreign { id: u8 },
    /// The byte after the payload was not the suffix.
    Resync { byte: u8 },
    /// A complete frame failed its checksum and was discarded.
    Corrupt { received: u16, computed: u16 },
    /// A complete, valid frame.
    Complete(T),
}

impl<T> Step<T> {
    /// The decoded value, if this byte completed a valid frame.
    pub fn into_value(self) -> Option<T> {
        match self {
            Step::Complete(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Step::Complete(_))
    }
}

/// Running counters for one decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Bytes fed in.
    pub bytes: u64,
    /// Frames decoded and returned.
    pub frames: u64,
    /// Frames skipped because they carried another channel's id.
    pub foreign: u64,
    /// Frames dropped because the suffix was missing.
    pub resyncs: u64,
    /// Frames dropped because the checksum did not match.
    pub corrupt: u64,
}

/// The state machine shared by the typed and raw decoders.
#[derive(Debug, Clone)]
struct Machine {
    channel: ChannelId,
    config: FrameConfig,
    stage: Stage,
    cursor: usize,
    scratch: Vec<u8>,
    checksum_lo: u8,
    stats: DecoderStats,
}

impl Machine {
    fn new(channel: ChannelId, size: usize, config: FrameConfig) -> Self {
        Self {
            channel,
            config,
            stage: Stage::WaitPrefix,
            cursor: 0,
            scratch: vec![0; size],
            checksum_lo: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Feed one byte. On a valid frame, `complete` turns the payload bytes
    /// into the caller's value.
    fn advance<U>(&mut self, byte: u8, complete: impl FnOnce(&[u8]) -> Option<U>) -> Step<U> {
        self.stats.bytes += 1;
        match self.stage {
            Stage::WaitPrefix => {
                if byte == self.config.prefix() {
                    self.stage = Stage::WaitId;
                }
                Step::Pending
            }
            Stage::WaitId => {
                if byte != self.channel.get() {
                    self.stage = Stage::WaitPrefix;
                    self.stats.foreign += 1;
                    trace!(channel = self.channel.get(), id = byte, "skipping foreign frame");
                    return Step::Foreign { id: byte };
                }
                self.cursor = 0;
                self.stage = if self.scratch.is_empty() {
                    Stage::WaitSuffix
                } else {
                    Stage::ReadPayload
                };
                Step::Pending
            }
            Stage::ReadPayload => {
                self.scratch[self.cursor] = byte;
                self.cursor += 1;
                if self.cursor == self.scratch.len() {
                    self.stage = Stage::WaitSuffix;
                }
                Step::Pending
            }
            Stage::WaitSuffix => {
                if byte == self.config.suffix() {
                    self.checksum_lo = 0;
                    self.stage = Stage::ReadChecksumLo;
                    return Step::Pending;
                }
                match self.config.suffix_policy() {
                    SuffixPolicy::Stall => Step::Pending,
                    SuffixPolicy::Resync => {
                        self.stage = Stage::WaitPrefix;
                        self.stats.resyncs += 1;
                        debug!(
                            channel = self.channel.get(),
                            byte, "suffix missing, resynchronizing"
                        );
                        Step::Resync { byte }
                    }
                }
            }
            Stage::ReadChecksumLo => {
                self.checksum_lo = byte;
                self.stage = Stage::ReadChecksumHi;
                Step::Pending
            }
            Stage::ReadChecksumHi => {
                self.stage = Stage::WaitPrefix;
                let received = u16::from_le_bytes([self.checksum_lo, byte]);
                let computed = checksum::compute(&self.scratch);
                if received != computed {
                    self.stats.corrupt += 1;
                    debug!(
                        channel = self.channel.get(),
                        received, computed, "checksum mismatch, frame dropped"
                    );
                    return Step::Corrupt { received, computed };
                }
                match complete(&self.scratch) {
                    Some(value) => {
                        self.stats.frames += 1;
                        trace!(channel = self.channel.get(), len = self.scratch.len(), "decoded frame");
                        Step::Complete(value)
                    }
                    None => Step::Pending,
                }
            }
        }
    }

    fn reset(&mut self) {
        self.stage = Stage::WaitPrefix;
        self.cursor = 0;
        self.checksum_lo = 0;
    }
}

/// Decodes frames for one channel into values of type `T`.
pub struct Decoder<T> {
    machine: Machine,
    _payload: PhantomData<fn() -> T>,
}

impl<T: Payload> Decoder<T> {
    pub fn new(channel: ChannelId) -> Self {
        Self::with_config(channel, FrameConfig::default())
    }

    pub fn with_config(channel: ChannelId, config: FrameConfig) -> Self {
        Self {
            machine: Machine::new(channel, std::mem::size_of::<T>(), config),
            _payload: PhantomData,
        }
    }

    /// Feed one byte. Returns the value on the byte that completes a valid
    /// frame for this channel, `None` otherwise.
    pub fn accept(&mut self, byte: u8) -> Option<T> {
        self.step(byte).into_value()
    }

    /// Feed one byte and report what happened.
    pub fn step(&mut self, byte: u8) -> Step<T> {
        // The scratch buffer is exactly size_of::<T>() bytes, so the read
        // cannot fail.
        self.machine
            .advance(byte, |payload| T::read_from_bytes(payload).ok())
    }

    /// Feed a run of bytes and collect every value decoded along the way.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<T> {
        bytes.iter().filter_map(|&b| self.accept(b)).collect()
    }

    /// Drop any partial frame and go back to scanning for a prefix.
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    pub fn stage(&self) -> Stage {
        self.machine.stage
    }

    pub fn stats(&self) -> DecoderStats {
        self.machine.stats
    }

    pub fn channel(&self) -> ChannelId {
        self.machine.channel
    }

    pub fn config(&self) -> &FrameConfig {
        &self.machine.config
    }
}

impl<T> Clone for Decoder<T> {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Decoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("channel", &self.machine.channel)
            .field("stage", &self.machine.stage)
            .field("payload_size", &self.machine.scratch.len())
            .finish()
    }
}

/// Decodes frames whose payload size is only known at run time.
#[derive(Debug, Clone)]
pub struct RawDecoder {
    machine: Machine,
}

impl RawDecoder {
    pub fn new(channel: ChannelId, size: usize) -> Result<Self> {
        Self::with_config(channel, size, FrameConfig::default())
    }

    /// Fails with [`FrameError::PayloadTooLarge`] when `size` exceeds
    /// [`MAX_RAW_PAYLOAD`].
    pub fn with_config(channel: ChannelId, size: usize, config: FrameConfig) -> Result<Self> {
        if size > MAX_RAW_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: MAX_RAW_PAYLOAD,
            });
        }
        Ok(Self {
            machine: Machine::new(channel, size, config),
        })
    }

    /// Feed one byte. Returns a copy of the payload on frame completion.
    pub fn accept(&mut self, byte: u8) -> Option<Bytes> {
        self.step(byte).into_value()
    }

    /// Feed one byte and report what happened.
    pub fn step(&mut self, byte: u8) -> Step<Bytes> {
        self.machine
            .advance(byte, |payload| Some(Bytes::copy_from_slice(payload)))
    }

    /// Feed a run of bytes and collect every payload decoded along the way.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Bytes> {
        bytes.iter().filter_map(|&b| self.accept(b)).collect()
    }

    pub fn reset(&mut self) {
        self.machine.reset();
    }

    pub fn stage(&self) -> Stage {
        self.machine.stage
    }

    pub fn stats(&self) -> DecoderStats {
        self.machine.stats
    }

    pub fn channel(&self) -> ChannelId {
        self.machine.channel
    }

    pub fn payload_size(&self) -> usize {
        self.machine.scratch.len()
    }

    pub fn config(&self) -> &FrameConfig {
        &self.machine.config
    }
}
