//! # SWD Format
//!
//! The SWD container: a 12-byte header followed either by one bitstream for
//! the whole file, or by a seek table and independently compressed blocks.
//!
//! ```text
//! whole file   [header][bitstream ............................]
//! block file   [header][seek table][block 0][block 1] ... [block n-1]
//! ```
//!
//! Block files let a reader expand any single block without touching the
//! rest, which is what small targets such as the Gameboy use them for.
//!
//! ## Example
//!
//! ```rust
//! use swd_format::{BlockSize, ShrinkOptions, compress, decompress};
//!
//! let data = vec![7u8; 20_000];
//! let options = ShrinkOptions::new().with_blocks(BlockSize::Size4K);
//! let packed = compress(&data, "bin", &options).unwrap();
//!
//! let (header, unpacked) = decompress(&packed).unwrap();
//! assert_eq!(header.extension(), "bin");
//! assert_eq!(unpacked, data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod header;
pub mod index;
pub mod whole;

use log::debug;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use swd_core::error::{IoContext, Result, SwdError};
use swd_lzss::{BitOrder, LzssConfig};

// Re-exports
pub use block::{BlockPayload, expand_blocks, pack_block, shrink_blocks};
pub use header::{BlockSize, HEADER_LEN, SWD_MAGIC, SwdHeader, is_swd};
pub use index::{BlockIndex, BlockSpan, IndexEntry};
pub use whole::{expand_whole, shrink_whole};

/// How to shrink a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShrinkOptions {
    /// Engine parameters.
    pub config: LzssConfig,
    /// Byte order of wide payloads.
    pub order: BitOrder,
    /// Block size, or `None` for a whole-file stream.
    pub block_size: Option<BlockSize>,
}

impl ShrinkOptions {
    /// Whole-file stream, standard order, SWD engine parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine parameters.
    pub fn with_config(mut self, config: LzssConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the byte order.
    pub fn with_order(mut self, order: BitOrder) -> Self {
        self.order = order;
        self
    }

    /// Write a block container with the given block size.
    pub fn with_blocks(mut self, block_size: BlockSize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Write a block container with the default size for the byte order.
    pub fn with_default_blocks(mut self) -> Self {
        self.block_size = Some(BlockSize::default_for(self.order));
        self
    }

    /// Build the header for a file of `original_len` bytes.
    pub fn header(&self, original_len: u64, extension: &str) -> Result<SwdHeader> {
        let len = u32::try_from(original_len).map_err(|_| {
            SwdError::illegal_config(format!(
                "{} bytes is too large for the SWD header",
                original_len
            ))
        })?;
        let header = match self.block_size {
            Some(block_size) => SwdHeader::blocks(self.order, block_size, len),
            None => SwdHeader::whole(self.order, len),
        };
        Ok(header.with_extension(extension))
    }
}

/// Summary of one shrunk file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// Length of the original file.
    pub original_len: u64,
    /// Length of the container, header included.
    pub container_len: u64,
    /// Number of blocks (zero for a whole-file stream).
    pub blocks: usize,
    /// Blocks kept raw because compression did not pay off.
    pub stored_blocks: usize,
}

impl ContainerStats {
    /// Container size as a percentage of the original size.
    pub fn ratio(&self) -> f64 {
        if self.original_len == 0 {
            100.0
        } else {
            self.container_len as f64 * 100.0 / self.original_len as f64
        }
    }
}

/// Header and seek table of an existing container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// The file header.
    pub header: SwdHeader,
    /// The seek table of a block container.
    pub index: Option<BlockIndex>,
    /// Total length of the container.
    pub container_len: u64,
}

/// Shrink `original_len` bytes from `reader` into `writer`.
pub fn shrink<R, W>(
    reader: &mut R,
    writer: &mut W,
    original_len: u64,
    extension: &str,
    options: &ShrinkOptions,
) -> Result<ContainerStats>
where
    R: Read,
    W: Write + Seek,
{
    options.config.validate()?;
    let header = options.header(original_len, extension)?;
    if header.is_block() {
        shrink_blocks(reader, writer, &header, options.config)
    } else {
        shrink_whole(reader, writer, &header, options.config)
    }
}

/// Expand a container from `reader` into `writer`.
///
/// Returns the header, which tells the caller the original extension.
pub fn expand<R, W>(reader: &mut R, writer: &mut W) -> Result<SwdHeader>
where
    R: Read + Seek,
    W: Write,
{
    let header = SwdHeader::read(reader)?;
    let written = if header.is_block() {
        expand_blocks(reader, writer, &header)?
    } else {
        expand_whole(reader, writer, &header)?
    };
    debug!(
        "expanded {} bytes ({}, {})",
        written,
        header.order().name(),
        header
            .block_size()
            .map_or("whole file", |size| size.name())
    );
    Ok(header)
}

/// Shrink `data` into an in-memory container.
pub fn compress(data: &[u8], extension: &str, options: &ShrinkOptions) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    shrink(
        &mut Cursor::new(data),
        &mut out,
        data.len() as u64,
        extension,
        options,
    )?;
    Ok(out.into_inner())
}

/// Shrink `data` into an in-memory block container.
///
/// Uses the options' block size, or the default size for its byte order.
pub fn compress_blocks(data: &[u8], extension: &str, options: &ShrinkOptions) -> Result<Vec<u8>> {
    let header = block_header(data, extension, options)?;
    block::compress_blocks(data, &header, options.config)
}

/// Shrink `data` into an in-memory block container, compressing blocks in
/// parallel. The output is byte-identical to [`compress_blocks`].
#[cfg(feature = "parallel")]
pub fn compress_blocks_parallel(
    data: &[u8],
    extension: &str,
    options: &ShrinkOptions,
) -> Result<Vec<u8>> {
    let header = block_header(data, extension, options)?;
    block::compress_blocks_parallel(data, &header, options.config)
}

fn block_header(data: &[u8], extension: &str, options: &ShrinkOptions) -> Result<SwdHeader> {
    options.config.validate()?;
    let options = match options.block_size {
        Some(_) => *options,
        None => options.with_default_blocks(),
    };
    options.header(data.len() as u64, extension)
}

/// Expand an in-memory container.
pub fn decompress(data: &[u8]) -> Result<(SwdHeader, Vec<u8>)> {
    let mut out = Vec::new();
    let header = expand(&mut Cursor::new(data), &mut out)?;
    Ok((header, out))
}

/// Check whether `reader` starts with an SWD header.
///
/// Returns `None` for anything else, including inputs shorter than a
/// header.
pub fn detect<R: Read>(reader: &mut R) -> Result<Option<SwdHeader>> {
    let mut prefix = Vec::with_capacity(HEADER_LEN);
    reader
        .take(HEADER_LEN as u64)
        .read_to_end(&mut prefix)
        .on_read()?;
    if !is_swd(&prefix) {
        return Ok(None);
    }
    let mut buf = [0u8; HEADER_LEN];
    buf.copy_from_slice(&prefix);
    SwdHeader::from_bytes(&buf).map(Some)
}

/// Read the header and, for block containers, the seek table.
pub fn read_info<R: Read + Seek>(reader: &mut R) -> Result<ContainerInfo> {
    let start = reader.stream_position().on_seek()?;
    let container_len = reader.seek(SeekFrom::End(0)).on_seek()? - start;
    reader.seek(SeekFrom::Start(start)).on_seek()?;

    let header = SwdHeader::read(reader)?;
    let index = match header.block_size() {
        Some(block_size) => {
            let count = BlockIndex::entry_count(u64::from(header.original_len()), block_size);
            Some(BlockIndex::read(reader, count)?)
        }
        None => None,
    };

    Ok(ContainerInfo {
        header,
        index,
        container_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_header() {
        let header = ShrinkOptions::new()
            .with_order(BitOrder::Gameboy)
            .with_default_blocks()
            .header(5000, "map")
            .unwrap();
        assert_eq!(header.flags(), 0xD0);
        assert_eq!(header.extension(), "map");

        let err = ShrinkOptions::new().header(u64::from(u32::MAX) + 1, "").unwrap_err();
        assert!(matches!(err, SwdError::IllegalConfig { .. }));
    }

    #[test]
    fn test_whole_file_roundtrip() {
        let data = b"whole file whole file whole file".to_vec();
        let packed = compress(&data, "txt", &ShrinkOptions::new()).unwrap();
        assert_eq!(&packed[..4], b"sWd\x80");

        let (header, out) = decompress(&packed).unwrap();
        assert!(!header.is_block());
        assert_eq!(out, data);
    }

    #[test]
    fn test_detect() {
        let packed = compress(b"abc", "", &ShrinkOptions::new()).unwrap();
        assert!(detect(&mut &packed[..]).unwrap().is_some());
        assert!(detect(&mut &b"plain text file"[..]).unwrap().is_none());
        assert!(detect(&mut &b"sWd"[..]).unwrap().is_none());
    }

    #[test]
    fn test_compress_blocks_uses_default_size() {
        let data = vec![1u8; 5000];
        let options = ShrinkOptions::new().with_order(BitOrder::Gameboy);
        let packed = compress_blocks(&data, "", &options).unwrap();
        let info = read_info(&mut Cursor::new(&packed)).unwrap();
        assert_eq!(info.header.block_size(), Some(BlockSize::Size2K));
        assert_eq!(info.index.map(|i| i.block_count()), Some(3));
        assert_eq!(info.container_len, packed.len() as u64);
    }

    #[test]
    fn test_invalid_config_rejected_before_writing() {
        let options = ShrinkOptions::new().with_config(LzssConfig {
            break_even: 1,
            max_length: 1,
            max_offset: 100,
        });
        let mut out = Cursor::new(Vec::new());
        let err = shrink(&mut &b"abc"[..], &mut out, 3, "", &options).unwrap_err();
        assert!(err.is_fatal());
        assert!(out.into_inner().is_empty());
    }
}
