//! Channel ids.
//!
//! One byte on the wire identifies which logical object a frame carries.
//! Id 0 is reserved, so at most 255 channels can share a physical stream.

use std::fmt;
use std::num::NonZeroU8;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{FrameError, Result};

/// Number of ids an allocator can hand out.
pub const MAX_CHANNELS: u8 = u8::MAX;

/// Identifier of one logical channel (1-255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(NonZeroU8);

impl ChannelId {
    /// Build an id agreed out-of-band. Fails for 0.
    pub fn new(id: u8) -> Result<Self> {
        NonZeroU8::new(id)
            .map(Self)
            .ok_or(FrameError::InvalidChannel(id))
    }

    /// The wire byte.
    pub fn get(self) -> u8 {
        self.0.get()
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = FrameError;

    fn try_from(id: u8) -> Result<Self> {
        Self::new(id)
    }
}

impl From<ChannelId> for u8 {
    fn from(id: ChannelId) -> u8 {
        id.get()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out unique channel ids, starting at 1.
///
/// Safe to share between threads; concurrent callers never receive the same
/// id. After [`MAX_CHANNELS`] allocations every call fails with
/// [`FrameError::ChannelsExhausted`].
#[derive(Debug)]
pub struct IdAllocator {
    // Number of ids issued so far; the next id is `issued + 1`.
    issued: AtomicU8,
}

static GLOBAL: IdAllocator = IdAllocator::new();

impl IdAllocator {
    pub const fn new() -> Self {
        Self {
            issued: AtomicU8::new(0),
        }
    }

    /// The process-wide allocator.
    pub fn global() -> &'static IdAllocator {
        &GLOBAL
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> Result<ChannelId> {
        let previous = self
            .issued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1))
            .map_err(|_| FrameError::ChannelsExhausted { max: MAX_CHANNELS })?;
        // previous + 1 cannot overflow: checked_add succeeded.
        ChannelId::new(previous + 1)
    }

    /// How many ids have been handed out.
    pub fn issued(&self) -> u8 {
        self.issued.load(Ordering::Acquire)
    }

    /// How many ids remain.
    pub fn remaining(&self) -> u8 {
        MAX_CHANNELS - self.issued()
    }

    /// Forget every issued id. Ids handed out before the reset may be
    /// issued again.
    pub fn reset(&self) {
        self.issued.store(0, Ordering::Release);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocate from the process-wide allocator.
pub fn next_id() -> Result<ChannelId> {
    IdAllocator::global().next_id()
}
