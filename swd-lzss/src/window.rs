//! Mirrored sliding window for the encoder.
//!
//! Every byte is stored twice: at its slot and again `size` bytes later.
//! Any run of up to `size` bytes starting at any slot is then one contiguous
//! slice, so string comparisons never have to wrap.

use swd_core::error::{Result, SwdError};

/// Circular byte window with a mirror region.
#[derive(Debug, Clone)]
pub struct Window {
    /// Primary slots followed by their mirror.
    data: Vec<u8>,
    /// Number of primary slots (power of two).
    size: usize,
    /// `size - 1`.
    mask: usize,
}

impl Window {
    /// Allocate a window of `size` slots; `size` must be a power of two.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(SwdError::illegal_config(format!(
                "window size must be a power of 2, got {}",
                size
            )));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(size * 2)
            .map_err(|_| SwdError::no_memory(size * 2))?;
        data.resize(size * 2, 0);

        Ok(Self {
            data,
            size,
            mask: size - 1,
        })
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Reduce a position to its slot.
    #[inline]
    pub fn wrap(&self, position: usize) -> usize {
        position & self.mask
    }

    /// Store `byte` at `position` and its mirror.
    #[inline]
    pub fn write(&mut self, position: usize, byte: u8) {
        let slot = position & self.mask;
        self.data[slot] = byte;
        self.data[slot + self.size] = byte;
    }

    /// Byte at `position`.
    #[inline]
    pub fn byte(&self, position: usize) -> u8 {
        self.data[position & self.mask]
    }

    /// `len` bytes starting at `position`, read across the wrap point.
    ///
    /// `len` is capped at the window size.
    #[inline]
    pub fn slice(&self, position: usize, len: usize) -> &[u8] {
        let slot = position & self.mask;
        &self.data[slot..slot + len.min(self.size)]
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_makes_wrapped_runs_contiguous() {
        let mut window = Window::new(8).unwrap();
        for (i, &b) in b"01234567".iter().enumerate() {
            window.write(i, b);
        }
        window.write(8, b'X');
        window.write(9, b'Y');

        assert_eq!(window.slice(6, 4), b"67XY");
        assert_eq!(window.byte(9), b'Y');
        assert_eq!(window.slice(3, 100).len(), 8);
    }

    #[test]
    fn test_rejects_odd_sizes() {
        assert!(Window::new(0).is_err());
        assert!(Window::new(1000).is_err());
    }
}
