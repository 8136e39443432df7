//! Bit slot packing for the SWD bitstream.
//!
//! SWD interleaves variable-length bit codes with raw bytes in a single byte
//! stream. The first bit of a code group reserves a *bit slot*: a byte at the
//! current output end that collects the next eight code bits. Raw bytes sent
//! while a slot is open are appended after it, so the decoder finds every raw
//! byte right where it needs it without any alignment padding.
//!
//! # Bit Ordering
//!
//! Code values are sent most significant bit first, and each bit slot is
//! filled from its least significant bit upward. The receiver mirrors this
//! with a guard register: a byte is loaded together with a ninth marker bit,
//! bits are shifted out from the bottom, and the register reaching `1` means
//! the slot is exhausted.
//!
//! # Example
//!
//! ```
//! use swd_core::bitstream::{BitPacker, BitUnpacker};
//!
//! let mut packer = BitPacker::new().unwrap();
//! packer.send_bits(2, 0b10).unwrap();
//! packer.send_byte(0x41).unwrap();
//! packer.send_bits(3, 0b011).unwrap();
//! packer.flush();
//! assert_eq!(packer.output(), &[0b1_1001, 0x41]);
//!
//! let mut input: &[u8] = packer.output();
//! let mut unpacker = BitUnpacker::new();
//! assert_eq!(unpacker.recv_bits(&mut input, 2).unwrap(), 0b10);
//! assert_eq!(unpacker.recv_byte(&mut input).unwrap(), 0x41);
//! assert_eq!(unpacker.recv_bits(&mut input, 3).unwrap(), 0b011);
//! ```

use crate::error::{Result, SwdError};
use crate::queue::Queue;
use std::io::Write;

/// Default output buffer size of a [`BitPacker`].
pub const DEFAULT_PACKER_CAPACITY: usize = 0x2000 + 1024;

/// A source of raw bytes for [`BitUnpacker`].
pub trait ByteFeed {
    /// Next byte, or `None` when the feed is exhausted.
    fn next_byte(&mut self) -> Option<u8>;
}

impl ByteFeed for Queue<u8> {
    fn next_byte(&mut self) -> Option<u8> {
        self.pop()
    }
}

impl ByteFeed for &[u8] {
    fn next_byte(&mut self) -> Option<u8> {
        let (&first, rest) = self.split_first()?;
        *self = rest;
        Some(first)
    }
}

/// Writes bit codes and raw bytes into an in-memory byte queue.
#[derive(Debug)]
pub struct BitPacker {
    /// Packed output not yet drained.
    out: Queue<u8>,
    /// Stream position of the open bit slot.
    slot: Option<u64>,
    /// Next bit to set within the open slot.
    mask: u8,
    /// Total code bits sent.
    bits_sent: u64,
}

impl BitPacker {
    /// Create a packer with the default output capacity.
    pub fn new() -> Result<Self> {
        Self::with_capacity(DEFAULT_PACKER_CAPACITY)
    }

    /// Create a packer whose output queue starts at `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            out: Queue::with_capacity(capacity)?,
            slot: None,
            mask: 1,
            bits_sent: 0,
        })
    }

    /// Send the low `count` bits of `value`, most significant first.
    pub fn send_bits(&mut self, count: u8, value: u32) -> Result<()> {
        debug_assert!(count <= 32, "Cannot send more than 32 bits at once");

        for i in (0..count).rev() {
            let slot = match self.slot {
                Some(slot) => slot,
                None => self.open_slot()?,
            };

            if (value >> i) & 1 != 0 {
                let index = (slot - self.out.consumed()) as usize;
                let byte = self.out.get_mut(index);
                debug_assert!(byte.is_some(), "open bit slot was drained");
                if let Some(byte) = byte {
                    *byte |= self.mask;
                }
            }

            if self.mask == 0x80 {
                self.slot = None;
                self.mask = 1;
            } else {
                self.mask <<= 1;
            }
        }

        self.bits_sent += count as u64;
        Ok(())
    }

    /// Append a raw byte after any open bit slot.
    pub fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.out.ensure_capacity(1)?;
        let pushed = self.out.push(byte);
        debug_assert!(pushed);
        Ok(())
    }

    fn open_slot(&mut self) -> Result<u64> {
        self.out.ensure_capacity(1)?;
        let slot = self.out.end_position();
        let pushed = self.out.push(0);
        debug_assert!(pushed);
        self.slot = Some(slot);
        self.mask = 1;
        Ok(slot)
    }

    /// Close a partially filled bit slot; its unused high bits stay zero.
    ///
    /// Call once at the end of every bitstream segment.
    pub fn flush(&mut self) {
        self.slot = None;
        self.mask = 1;
    }

    /// Whether a bit slot is waiting for more bits.
    pub fn has_open_slot(&self) -> bool {
        self.slot.is_some()
    }

    /// Bytes that are final and can be drained: everything before the open
    /// slot, or all buffered bytes if no slot is open.
    pub fn ready_len(&self) -> usize {
        match self.slot {
            Some(slot) => (slot - self.out.consumed()) as usize,
            None => self.out.len(),
        }
    }

    /// Number of buffered bytes, including an open slot and what follows it.
    pub fn buffered_len(&self) -> usize {
        self.out.len()
    }

    /// Buffered output, including an open slot.
    pub fn output(&self) -> &[u8] {
        self.out.as_slice()
    }

    /// Total bytes ever produced.
    pub fn bytes_produced(&self) -> u64 {
        self.out.end_position()
    }

    /// Total code bits sent.
    pub fn bits_sent(&self) -> u64 {
        self.bits_sent
    }

    /// Write the ready bytes to `writer`, keeping an open slot (and the raw
    /// bytes that follow it) buffered.
    pub fn drain_ready<W: Write>(&mut self, writer: &mut W) -> Result<usize> {
        let ready = self.ready_len();
        self.out.drain_to(writer, ready)?;
        self.out.compact();
        Ok(ready)
    }

    /// Flush the open slot and write everything to `writer`.
    pub fn finish<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        self.flush();
        let all = self.out.len();
        self.out.drain_to(writer, all)
    }

    /// Drop all buffered output and start a new stream.
    pub fn reset(&mut self) {
        self.out.clear();
        self.slot = None;
        self.mask = 1;
        self.bits_sent = 0;
    }
}

/// Reads bit codes and raw bytes produced by [`BitPacker`].
#[derive(Debug, Clone)]
pub struct BitUnpacker {
    /// Remaining bits of the current slot above a marker bit; `1` = empty.
    guard: u16,
    /// Raw bytes fetched from the feed (slots and raw bytes alike).
    bytes_read: u64,
}

impl Default for BitUnpacker {
    fn default() -> Self {
        Self::new()
    }
}

impl BitUnpacker {
    /// Create an unpacker with an empty slot.
    pub fn new() -> Self {
        Self {
            guard: 1,
            bytes_read: 0,
        }
    }

    /// Receive `count` bits, most significant first.
    pub fn recv_bits<F: ByteFeed + ?Sized>(&mut self, feed: &mut F, count: u8) -> Result<u32> {
        debug_assert!(count <= 32, "Cannot receive more than 32 bits at once");

        let mut value = 0u32;
        for _ in 0..count {
            if self.guard == 1 {
                self.guard = self.fetch(feed)? as u16 | 0x100;
            }
            value = (value << 1) | (self.guard & 1) as u32;
            self.guard >>= 1;
        }
        Ok(value)
    }

    /// Receive a raw byte.
    pub fn recv_byte<F: ByteFeed + ?Sized>(&mut self, feed: &mut F) -> Result<u8> {
        self.fetch(feed)
    }

    fn fetch<F: ByteFeed + ?Sized>(&mut self, feed: &mut F) -> Result<u8> {
        let byte = feed
            .next_byte()
            .ok_or_else(|| SwdError::illegal_data(self.bytes_read, "unexpected end of bitstream"))?;
        self.bytes_read += 1;
        Ok(byte)
    }

    /// Discard the rest of the current slot.
    ///
    /// Call once at the end of every bitstream segment.
    pub fn flush(&mut self) {
        self.guard = 1;
    }

    /// Bytes consumed from the feed so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Start a new stream.
    pub fn reset(&mut self) {
        self.guard = 1;
        self.bytes_read = 0;
    }
}
