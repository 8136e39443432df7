//! Ring buffer (sliding window) for LZSS decompression.
//!
//! The decoder only needs the most recent output bytes to resolve
//! back-references, so history lives in a power-of-two circular buffer
//! indexed with a mask.

use crate::error::{Result, SwdError};

/// Decoder window size used by SWD streams.
pub const SWD_WINDOW: usize = 0x800;

/// A ring buffer holding decompression history.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    /// The underlying buffer.
    buffer: Vec<u8>,
    /// Current write position (next byte will be written here).
    position: usize,
    /// Number of bytes written (up to capacity).
    size: usize,
    /// Mask for efficient modulo (capacity - 1).
    mask: usize,
}

impl RingBuffer {
    /// Create a new ring buffer with the specified capacity.
    ///
    /// `capacity` must be a non-zero power of two.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(SwdError::illegal_config(format!(
                "window size must be a power of 2, got {}",
                capacity
            )));
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| SwdError::no_memory(capacity))?;
        buffer.resize(capacity, 0);

        Ok(Self {
            buffer,
            position: 0,
            size: 0,
            mask: capacity - 1,
        })
    }

    /// Create the 2 KiB window SWD streams are decoded with.
    pub fn swd() -> Result<Self> {
        Self::new(SWD_WINDOW)
    }

    /// Get the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of history bytes available (saturates at capacity).
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get the current write position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.position = 0;
        self.size = 0;
        self.buffer.fill(0);
    }

    /// Write a single byte to the buffer.
    pub fn write_byte(&mut self, byte: u8) {
        self.buffer[self.position] = byte;
        self.position = (self.position + 1) & self.mask;
        if self.size < self.buffer.len() {
            self.size += 1;
        }
    }

    /// Write multiple bytes to the buffer.
    #[cfg(test)]
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Read the byte `distance` positions back; distance 1 is the most
    /// recently written byte.
    ///
    /// Returns `None` if the distance reaches past the available history.
    #[cfg(test)]
    fn read_at_distance(&self, distance: usize) -> Option<u8> {
        if distance == 0 || distance > self.size {
            return None;
        }
        Some(self.buffer[self.position.wrapping_sub(distance) & self.mask])
    }

    /// Copy `length` bytes starting `distance` back, one byte at a time, so
    /// a copy may read bytes it has just written. Every produced byte is
    /// handed to `emit`.
    ///
    /// The caller validates `distance` against [`RingBuffer::len`].
    pub fn copy_from_history<F>(&mut self, distance: usize, length: usize, mut emit: F) -> Result<()>
    where
        F: FnMut(u8) -> Result<()>,
    {
        let mut src_pos = self.position.wrapping_sub(distance) & self.mask;

        for _ in 0..length {
            let byte = self.buffer[src_pos];
            self.write_byte(byte);
            emit(byte)?;
            src_pos = (src_pos + 1) & self.mask;
        }

        Ok(())
    }

    /// Get the last N bytes written.
    #[cfg(test)]
    fn last_bytes(&self, count: usize) -> Vec<u8> {
        let count = count.min(self.size);
        (0..count)
            .map(|i| self.buffer[self.position.wrapping_sub(count - i) & self.mask])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ringbuffer_basic() {
        let mut ring = RingBuffer::new(8).unwrap();
        ring.write_bytes(b"Hello");

        assert_eq!(ring.len(), 5);
        assert_eq!(ring.read_at_distance(1), Some(b'o'));
        assert_eq!(ring.read_at_distance(5), Some(b'H'));
        assert_eq!(ring.read_at_distance(6), None);
    }

    #[test]
    fn test_ringbuffer_wrap() {
        let mut ring = RingBuffer::new(4).unwrap();
        ring.write_bytes(b"ABCDEF");

        assert_eq!(ring.len(), 4);
        assert_eq!(ring.read_at_distance(1), Some(b'F'));
        assert_eq!(ring.read_at_distance(4), Some(b'C'));
    }

    #[test]
    fn test_ringbuffer_copy_overlap() {
        let mut ring = RingBuffer::new(32).unwrap();
        ring.write_bytes(b"AB");

        let mut out = Vec::new();
        ring.copy_from_history(2, 6, |b| {
            out.push(b);
            Ok(())
        })
        .unwrap();
        assert_eq!(out, b"ABABAB");
    }

    #[test]
    fn test_ringbuffer_copy_across_wrap() {
        let mut ring = RingBuffer::new(8).unwrap();
        ring.write_bytes(b"xxxxxabc");
        // Write position is back at slot 0.
        assert_eq!(ring.position(), 0);

        let mut out = Vec::new();
        ring.copy_from_history(3, 3, |b| {
            out.push(b);
            Ok(())
        })
        .unwrap();
        assert_eq!(out, b"abc");
        assert_eq!(ring.last_bytes(6), b"abcabc");
    }

    #[test]
    fn test_non_power_of_two_rejected() {
        assert!(matches!(
            RingBuffer::new(100),
            Err(SwdError::IllegalConfig { .. })
        ));
        assert!(RingBuffer::new(0).is_err());
    }
}
