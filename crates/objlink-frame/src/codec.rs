use bytes::{BufMut, BytesMut};
use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::channel::ChannelId;
use crate::checksum;
use crate::error::{FrameError, Result};

/// Default start-of-frame marker: ASCII `'a'`.
pub const DEFAULT_PREFIX: u8 = b'a';

/// Default end-of-payload marker: ASCII `'z'`.
pub const DEFAULT_SUFFIX: u8 = b'z';

/// Bytes a frame adds around its payload: prefix, id, suffix, checksum (2).
pub const OVERHEAD: usize = 5;

/// Largest payload a [`RawDecoder`](crate::RawDecoder) will buffer: 16 MiB.
pub const MAX_RAW_PAYLOAD: usize = 16 * 1024 * 1024;

/// Total wire size of a frame carrying `payload_size` bytes.
pub const fn frame_len(payload_size: usize) -> usize {
    payload_size + OVERHEAD
}

/// A value that can travel as a frame payload.
///
/// The payload is the value's raw memory, `size_of::<T>()` bytes in native
/// order, and any byte pattern of that size must be a valid `T`. Derive the
/// `zerocopy` traits on a `#[repr(C)]` struct without padding to opt in:
///
/// ```
/// use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
///
/// #[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
/// #[repr(C)]
/// struct Setpoint {
///     joint: u32,
///     angle: f32,
/// }
///
/// fn assert_payload<T: objlink_frame::Payload>() {}
/// assert_payload::<Setpoint>();
/// ```
pub trait Payload: IntoBytes + FromBytes + Immutable {}

impl<T: IntoBytes + FromBytes + Immutable> Payload for T {}

/// What the decoder does when the byte after the payload is not the suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuffixPolicy {
    /// Drop the frame and go back to scanning for a prefix.
    #[default]
    Resync,
    /// Keep waiting until a suffix byte shows up. The checksum then decides
    /// whether the stale payload is accepted.
    Stall,
}

/// Marker bytes and decoder behaviour shared by both ends of a link.
///
/// Only [`FrameConfig::new`] and `Default` build one, so the markers of any
/// config in hand are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    prefix: u8,
    suffix: u8,
    suffix_policy: SuffixPolicy,
}

impl FrameConfig {
    /// Config with custom markers and the default suffix policy.
    pub fn new(prefix: u8, suffix: u8) -> Result<Self> {
        let config = Self {
            prefix,
            suffix,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the suffix policy.
    pub fn with_suffix_policy(mut self, suffix_policy: SuffixPolicy) -> Self {
        self.suffix_policy = suffix_policy;
        self
    }

    /// Start-of-frame marker.
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// End-of-payload marker.
    pub fn suffix(&self) -> u8 {
        self.suffix
    }

    /// Receiver-side handling of a missing suffix.
    pub fn suffix_policy(&self) -> SuffixPolicy {
        self.suffix_policy
    }

    fn validate(&self) -> Result<()> {
        if self.prefix == self.suffix {
            return Err(FrameError::MarkersCollide(self.prefix));
        }
        Ok(())
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX,
            suffix: DEFAULT_SUFFIX,
            suffix_policy: SuffixPolicy::Resync,
        }
    }
}

/// Encode one frame into a buffer.
///
/// Wire format:
/// ```text
/// ┌────────┬────────┬───────────────┬────────┬─────────────┐
/// │ Prefix │ Id     │ Payload       │ Suffix │ Checksum    │
/// │ (1B)   │ (1B)   │ (S bytes)     │ (1B)   │ (2B LE)     │
/// │ 'a'    │ 1-255  │ raw value     │ 'z'    │ sum(payload)│
/// └────────┴────────┴───────────────┴────────┴─────────────┘
/// ```
///
/// There is no length field and no escaping; both ends must agree on `S`.
pub fn encode_frame(config: &FrameConfig, channel: ChannelId, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(frame_len(payload.len()));
    dst.put_u8(config.prefix());
    dst.put_u8(channel.get());
    dst.put_slice(payload);
    dst.put_u8(config.suffix());
    dst.put_u16_le(checksum::compute(payload));
}
