use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;
use crate::traits::{ByteSink, ByteSource};

/// In-memory byte pipe: bytes written to any clone come out of every clone,
/// in write order.
///
/// Stands in for a serial line in tests and demos. Reading never reports
/// [`Closed`](crate::TransportError::Closed); an empty loopback is simply
/// idle.
#[derive(Clone, Default)]
pub struct Loopback {
    queue: Arc<Mutex<VecDeque<u8>>>,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently queued.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return everything queued.
    pub fn drain(&self) -> Vec<u8> {
        self.lock().drain(..).collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        // A panic while holding the lock cannot leave the queue half-updated.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ByteSink for Loopback {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.lock().push_back(byte);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.lock().extend(bytes.iter().copied());
        Ok(())
    }
}

impl ByteSource for Loopback {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.lock().pop_front())
    }
}

impl std::fmt::Debug for Loopback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loopback").field("queued", &self.len()).finish()
    }
}
