//! SWD file header parsing and writing.
//!
//! ```text
//! offset  size  field
//! 0       3     magic "sWd"
//! 3       1     flags
//! 4       4     original extension without the dot, zero padded
//! 8       4     original length, big-endian
//! ```

use log::warn;
use std::io::{ErrorKind, Read, Write};
use swd_core::error::{IoContext, Result, SwdError};
use swd_lzss::BitOrder;

/// SWD magic bytes.
pub const SWD_MAGIC: [u8; 3] = *b"sWd";

/// Size of the header in bytes.
pub const HEADER_LEN: usize = 12;

/// Longest extension the header can carry.
pub const MAX_EXTENSION: usize = 4;

/// SWD header flags.
pub mod flags {
    /// Set on every SWD file.
    pub const SWD: u8 = 0x80;
    /// Wide payloads use the Gameboy byte order.
    pub const GAMEBOY: u8 = 0x40;
    /// Block size selector; zero means a whole-file stream.
    pub const BLOCK_MASK: u8 = 0x30;
    /// Position of the block size selector.
    pub const BLOCK_SHIFT: u8 = 4;
}

/// Block size of a block container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockSize {
    /// 2 KiB blocks.
    Size2K = 1,
    /// 4 KiB blocks.
    Size4K = 2,
    /// 8 KiB blocks.
    #[default]
    Size8K = 3,
}

impl BlockSize {
    /// Get the byte size of one block.
    pub fn size_bytes(self) -> usize {
        1024 << (self as u8)
    }

    /// Convert from the 2-bit selector field.
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            1 => Some(BlockSize::Size2K),
            2 => Some(BlockSize::Size4K),
            3 => Some(BlockSize::Size8K),
            _ => None,
        }
    }

    /// The 2-bit selector field value.
    pub fn selector(self) -> u8 {
        self as u8
    }

    /// Block size used when none is requested: 2 KiB for Gameboy files,
    /// 8 KiB otherwise.
    pub fn default_for(order: BitOrder) -> Self {
        match order {
            BitOrder::Gameboy => BlockSize::Size2K,
            BitOrder::Standard => BlockSize::Size8K,
        }
    }

    /// Short name ("2k", "4k", "8k").
    pub fn name(self) -> &'static str {
        match self {
            BlockSize::Size2K => "2k",
            BlockSize::Size4K => "4k",
            BlockSize::Size8K => "8k",
        }
    }
}

impl std::fmt::Display for BlockSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// SWD file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwdHeader {
    flags: u8,
    extension: [u8; MAX_EXTENSION],
    original_len: u32,
}

impl SwdHeader {
    /// Header for a whole-file stream.
    pub fn whole(order: BitOrder, original_len: u32) -> Self {
        Self {
            flags: flags::SWD | order_flag(order),
            extension: [0; MAX_EXTENSION],
            original_len,
        }
    }

    /// Header for a block container.
    pub fn blocks(order: BitOrder, block_size: BlockSize, original_len: u32) -> Self {
        Self {
            flags: flags::SWD | order_flag(order) | (block_size.selector() << flags::BLOCK_SHIFT),
            extension: [0; MAX_EXTENSION],
            original_len,
        }
    }

    /// Store the original file extension (without the dot).
    ///
    /// Longer extensions are cut to [`MAX_EXTENSION`] bytes on a character
    /// boundary.
    pub fn with_extension(mut self, extension: &str) -> Self {
        let extension = extension.trim_start_matches('.');
        let mut end = extension.len().min(MAX_EXTENSION);
        while !extension.is_char_boundary(end) {
            end -= 1;
        }
        if end < extension.len() {
            warn!(
                "extension \"{}\" will be shortened to {} letters",
                extension, MAX_EXTENSION
            );
        }

        self.extension = [0; MAX_EXTENSION];
        self.extension[..end].copy_from_slice(&extension.as_bytes()[..end]);
        self
    }

    /// Raw flags byte.
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Bit order of wide payloads.
    pub fn order(&self) -> BitOrder {
        if self.flags & flags::GAMEBOY != 0 {
            BitOrder::Gameboy
        } else {
            BitOrder::Standard
        }
    }

    /// Block size, or `None` for a whole-file stream.
    pub fn block_size(&self) -> Option<BlockSize> {
        BlockSize::from_selector((self.flags & flags::BLOCK_MASK) >> flags::BLOCK_SHIFT)
    }

    /// Whether this is a block container.
    pub fn is_block(&self) -> bool {
        self.flags & flags::BLOCK_MASK != 0
    }

    /// The stored extension, without the dot. Empty when none was stored.
    pub fn extension(&self) -> String {
        let end = self
            .extension
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_EXTENSION);
        String::from_utf8_lossy(&self.extension[..end]).into_owned()
    }

    /// Length of the original file.
    pub fn original_len(&self) -> u32 {
        self.original_len
    }

    /// Check the flags of a whole-file stream: only the SWD and Gameboy bits
    /// may be set.
    pub fn check_whole(&self) -> Result<()> {
        if self.flags & !flags::GAMEBOY != flags::SWD {
            return Err(SwdError::illegal_data(3, "Unknown SWD format"));
        }
        Ok(())
    }

    /// Serialize the header.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..3].copy_from_slice(&SWD_MAGIC);
        buf[3] = self.flags;
        buf[4..8].copy_from_slice(&self.extension);
        buf[8..12].copy_from_slice(&self.original_len.to_be_bytes());
        buf
    }

    /// Parse a header.
    pub fn from_bytes(buf: &[u8; HEADER_LEN]) -> Result<Self> {
        if !is_swd(buf) {
            return Err(SwdError::illegal_data(0, "not in SWD format"));
        }
        let mut extension = [0u8; MAX_EXTENSION];
        extension.copy_from_slice(&buf[4..8]);

        Ok(Self {
            flags: buf[3],
            extension,
            original_len: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }

    /// Write the header to a writer.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes()).on_write()
    }

    /// Read a header from a reader.
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        match reader.read_exact(&mut buf) {
            Ok(()) => Self::from_bytes(&buf),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(SwdError::illegal_data(
                0,
                "file is too short for an SWD header",
            )),
            Err(e) => Err(SwdError::IoRead(e)),
        }
    }
}

/// Whether `prefix` starts with an SWD header.
///
/// The magic must match and the SWD flag bit must be set.
pub fn is_swd(prefix: &[u8]) -> bool {
    prefix.len() >= HEADER_LEN && prefix[0..3] == SWD_MAGIC && prefix[3] >= flags::SWD
}

fn order_flag(order: BitOrder) -> u8 {
    match order {
        BitOrder::Gameboy => flags::GAMEBOY,
        BitOrder::Standard => 0,
    }
}
