//! Per-device receive buffer

use std::io::{self, Read};

/// Receive buffer size. Larger than the longest telegram, so a buffer that
/// fills up without yielding one means the resync guarantee was broken.
pub const RAW_FRAME_CAPACITY: usize = 1024;

/// Bytes received from one device and not yet framed.
pub struct RawFrame {
    buf: [u8; RAW_FRAME_CAPACITY],
    len: usize,
}

impl RawFrame {
    /// Empty buffer.
    pub const fn new() -> Self {
        Self {
            buf: [0; RAW_FRAME_CAPACITY],
            len: 0,
        }
    }

    /// Valid bytes, oldest first.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Number of valid bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether no byte can be appended.
    pub fn is_full(&self) -> bool {
        self.len == RAW_FRAME_CAPACITY
    }

    /// Fixed capacity.
    pub const fn capacity(&self) -> usize {
        RAW_FRAME_CAPACITY
    }

    /// One read from `src` into the free tail of the buffer.
    ///
    /// Returns the number of bytes appended. A full buffer reads nothing, so
    /// callers must check [`is_full`](Self::is_full) first to tell that
    /// apart from end of stream.
    pub fn fill_from<R: Read + ?Sized>(&mut self, src: &mut R) -> io::Result<usize> {
        let read = src.read(&mut self.buf[self.len..])?;
        self.len += read;
        Ok(read)
    }

    /// Append as much of `bytes` as fits, returning the number appended.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(RAW_FRAME_CAPACITY - self.len);
        self.buf[self.len..self.len + count].copy_from_slice(&bytes[..count]);
        self.len += count;
        count
    }

    /// Drop `count` leading bytes and move the rest to the front.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.len);
        self.buf.copy_within(count..self.len, 0);
        self.len -= count;
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("len", &self.len)
            .field("capacity", &RAW_FRAME_CAPACITY)
            .finish()
    }
}
