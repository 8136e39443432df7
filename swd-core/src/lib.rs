//! # SWD Core
//!
//! Core components for the SWD compressor.
//!
//! This crate provides the building blocks shared by the codec and the
//! container layers:
//!
//! - [`bitstream`]: Bit slot packer/unpacker for interleaved codes and raw bytes
//! - [`queue`]: Compacting FIFO used by every pipeline buffer
//! - [`ringbuffer`]: Sliding window buffer for LZSS decompression
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! SWD is designed as a layered stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L4: CLI                                                 │
//! │     swd shrink / expand / info / test                   │
//! ├─────────────────────────────────────────────────────────┤
//! │ L3: Container                                           │
//! │     12-byte header, block seek table                    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     LZSS dictionary, token state machines, prefix codes │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Core (this crate)                                   │
//! │     BitPacker/BitUnpacker, Queue, RingBuffer            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use swd_core::bitstream::{BitPacker, BitUnpacker};
//!
//! let mut packer = BitPacker::new().unwrap();
//! packer.send_bits(4, 0b1101).unwrap();
//! packer.flush();
//!
//! let mut input: &[u8] = packer.output();
//! let mut unpacker = BitUnpacker::new();
//! assert_eq!(unpacker.recv_bits(&mut input, 4).unwrap(), 0b1101);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod error;
pub mod queue;
pub mod ringbuffer;

// Re-exports for convenience
pub use bitstream::{BitPacker, BitUnpacker, ByteFeed};
pub use error::{IoContext, Result, SwdError};
pub use queue::Queue;
pub use ringbuffer::RingBuffer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitPacker, BitUnpacker, ByteFeed};
    pub use crate::error::{IoContext, Result, SwdError};
    pub use crate::queue::Queue;
    pub use crate::ringbuffer::RingBuffer;
}
