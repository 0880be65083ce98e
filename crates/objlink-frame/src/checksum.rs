//! Additive 16-bit payload checksum.
//!
//! Every payload byte is widened and summed modulo 2^16. Cheap enough for a
//! microcontroller, but any corruption that preserves the byte sum (two
//! compensating flips, reordered bytes) goes unnoticed.

/// Running checksum, fed one byte at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u16);

impl Checksum {
    pub const fn new() -> Self {
        Self(0)
    }

    /// Fold one byte into the sum.
    pub fn update(&mut self, byte: u8) {
        self.0 = self.0.wrapping_add(u16::from(byte));
    }

    /// Fold a run of bytes into the sum.
    pub fn extend(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&b| self.update(b));
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Wire order: low byte first.
    pub fn to_le_bytes(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

/// Checksum of a complete payload.
pub fn compute(payload: &[u8]) -> u16 {
    let mut sum = Checksum::new();
    sum.extend(payload);
    sum.value()
}
