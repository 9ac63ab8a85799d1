//! Pooled byte accumulators for batching encoded text.
//!
//! A table dump acquires one [`Accumulator`] from a [`BufferPool`], appends
//! statement text to it, and hands filled contents to the writer pipe as
//! immutable [`Bytes`]. The accumulator goes back to the pool when dropped.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use bytes::{Bytes, BytesMut};

/// Default flush threshold and pre-reserved accumulator capacity (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1_048_576;

/// Idle buffers kept by a pool; extra released buffers are freed.
const MAX_IDLE_BUFFERS: usize = 16;

/// Free list of reusable byte buffers, safe to share across concurrent dumps.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<BytesMut>>,
    max_idle: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_max_idle(MAX_IDLE_BUFFERS)
    }

    /// Create a pool that retains at most `max_idle` released buffers.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Process-wide pool shared by every dump that does not bring its own.
    pub fn global() -> Arc<BufferPool> {
        static POOL: OnceLock<Arc<BufferPool>> = OnceLock::new();
        POOL.get_or_init(|| Arc::new(BufferPool::new())).clone()
    }

    /// Take an empty accumulator with at least `threshold` bytes reserved.
    pub fn acquire(self: &Arc<Self>, threshold: usize) -> Accumulator {
        let mut buf = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        buf.clear();
        buf.reserve(threshold);
        Accumulator {
            buf,
            threshold,
            pool: Arc::clone(self),
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, mut buf: BytesMut) {
        buf.clear();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_idle {
            free.push(buf);
        }
    }
}

/// Growable byte accumulator bounded by a flush threshold.
///
/// Exclusively owned by one producer. [`Accumulator::take_chunk`] moves the
/// accumulated bytes out as an immutable view; later writes never touch
/// bytes that were already handed off.
#[derive(Debug)]
pub struct Accumulator {
    buf: BytesMut,
    threshold: usize,
    pool: Arc<BufferPool>,
}

impl Accumulator {
    /// Writable access to the underlying buffer.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether the accumulated length has reached the flush threshold.
    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.threshold
    }

    /// Move the accumulated bytes out and leave the accumulator empty.
    pub fn take_chunk(&mut self) -> Bytes {
        let chunk = self.buf.split().freeze();
        self.buf.reserve(self.threshold);
        chunk
    }

    /// Return the accumulator to its pool.
    pub fn release(self) {}
}

impl Drop for Accumulator {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
