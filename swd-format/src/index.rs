//! Block seek table.
//!
//! A block container holds `ceil(len / block_size) + 1` big-endian `u32`
//! entries right after the header. Each entry is `(offset << 4) | flag`,
//! where `offset` is the block's position from the start of the container
//! and a non-zero flag marks a compressed block. The final entry marks the
//! end of the last block.

use crate::header::BlockSize;
use std::io::{ErrorKind, Read, Write};
use swd_core::error::{IoContext, Result, SwdError};

/// Size of one table entry in bytes.
pub const ENTRY_LEN: usize = 4;

/// Largest offset an entry can hold.
pub const MAX_ENTRY_OFFSET: u64 = (1 << 28) - 1;

/// One seek table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset of the block from the start of the container.
    pub offset: u32,
    /// Whether the block holds an SWD bitstream rather than raw bytes.
    pub compressed: bool,
}

impl IndexEntry {
    /// Create an entry, checking that the offset fits in 28 bits.
    pub fn new(offset: u64, compressed: bool) -> Result<Self> {
        if offset > MAX_ENTRY_OFFSET {
            return Err(SwdError::illegal_config(format!(
                "block offset {} does not fit in the seek table",
                offset
            )));
        }
        Ok(Self {
            offset: offset as u32,
            compressed,
        })
    }

    /// Encoded table value.
    pub fn to_raw(self) -> u32 {
        (self.offset << 4) | u32::from(self.compressed)
    }

    /// Decode a table value.
    pub fn from_raw(raw: u32) -> Self {
        Self {
            offset: raw >> 4,
            compressed: raw & 0x0F != 0,
        }
    }
}

/// Location of one block inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// Offset of the block from the start of the container.
    pub offset: u64,
    /// Bytes stored in the file for this block.
    pub stored_len: u64,
    /// Whether the block is compressed.
    pub compressed: bool,
}

/// Complete seek table of a block container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockIndex {
    entries: Vec<IndexEntry>,
}

impl BlockIndex {
    /// Number of table entries for a file of `original_len` bytes.
    pub fn entry_count(original_len: u64, block_size: BlockSize) -> usize {
        original_len.div_ceil(block_size.size_bytes() as u64) as usize + 1
    }

    /// Create an empty table with room for `count` entries.
    pub fn with_capacity(count: usize) -> Result<Self> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(count)
            .map_err(|_| SwdError::no_memory(count * ENTRY_LEN))?;
        Ok(Self { entries })
    }

    /// Append an entry.
    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    /// All entries, including the end entry.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of blocks described by the table.
    pub fn block_count(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    /// Size of the table in the file.
    pub fn byte_len(&self) -> usize {
        self.entries.len() * ENTRY_LEN
    }

    /// Location of block `index`.
    pub fn block(&self, index: usize) -> Result<BlockSpan> {
        let (Some(start), Some(end)) = (self.entries.get(index), self.entries.get(index + 1))
        else {
            return Err(SwdError::illegal_data(
                (index * ENTRY_LEN) as u64,
                format!("seek table has no entry for block {}", index),
            ));
        };
        if end.offset < start.offset {
            return Err(SwdError::illegal_data(
                (index * ENTRY_LEN) as u64,
                format!("seek table entries for block {} run backwards", index),
            ));
        }
        Ok(BlockSpan {
            offset: u64::from(start.offset),
            stored_len: u64::from(end.offset - start.offset),
            compressed: start.compressed,
        })
    }

    /// Iterate over the locations of all blocks.
    pub fn blocks(&self) -> impl Iterator<Item = Result<BlockSpan>> + '_ {
        (0..self.block_count()).map(move |i| self.block(i))
    }

    /// Write `count` zeroed entries to reserve room for the table.
    pub fn write_placeholder<W: Write + ?Sized>(writer: &mut W, count: usize) -> Result<()> {
        let zeros = [0u8; ENTRY_LEN];
        for _ in 0..count {
            writer.write_all(&zeros).on_write()?;
        }
        Ok(())
    }

    /// Serialize the table in big-endian form.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.entries
            .iter()
            .flat_map(|e| e.to_raw().to_be_bytes())
            .collect()
    }

    /// Write the table to a writer.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes()).on_write()
    }

    /// Read `count` entries from a reader.
    pub fn read<R: Read + ?Sized>(reader: &mut R, count: usize) -> Result<Self> {
        let mut index = Self::with_capacity(count)?;
        let mut raw = [0u8; ENTRY_LEN];
        for i in 0..count {
            reader.read_exact(&mut raw).map_err(|e| {
                if e.kind() == ErrorKind::UnexpectedEof {
                    SwdError::illegal_data(
                        (i * ENTRY_LEN) as u64,
                        format!("seek table ends after {} of {} entries", i, count),
                    )
                } else {
                    SwdError::IoRead(e)
                }
            })?;
            index.push(IndexEntry::from_raw(u32::from_be_bytes(raw)));
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_encoding() {
        let entry = IndexEntry::new(24, true).unwrap();
        assert_eq!(entry.to_raw(), 0x181);
        assert_eq!(IndexEntry::from_raw(0x181), entry);
        assert!(!IndexEntry::from_raw(0x180).compressed);

        assert!(IndexEntry::new(MAX_ENTRY_OFFSET, false).is_ok());
        assert!(matches!(
            IndexEntry::new(MAX_ENTRY_OFFSET + 1, false),
            Err(SwdError::IllegalConfig { .. })
        ));
    }

    #[test]
    fn test_entry_count() {
        assert_eq!(BlockIndex::entry_count(0, BlockSize::Size8K), 1);
        assert_eq!(BlockIndex::entry_count(1, BlockSize::Size8K), 2);
        assert_eq!(BlockIndex::entry_count(8192, BlockSize::Size8K), 2);
        assert_eq!(BlockIndex::entry_count(10_000, BlockSize::Size8K), 3);
        assert_eq!(BlockIndex::entry_count(10_000, BlockSize::Size2K), 6);
    }

    #[test]
    fn test_spans_and_big_endian() {
        let mut index = BlockIndex::with_capacity(3).unwrap();
        index.push(IndexEntry::new(24, true).unwrap());
        index.push(IndexEntry::new(1000, false).unwrap());
        index.push(IndexEntry::new(2808, false).unwrap());

        assert_eq!(index.block_count(), 2);
        assert_eq!(
            index.block(0).unwrap(),
            BlockSpan {
                offset: 24,
                stored_len: 976,
                compressed: true
            }
        );
        assert_eq!(index.block(1).unwrap().stored_len, 1808);
        assert!(index.block(2).is_err());

        let bytes = index.to_bytes();
        assert_eq!(&bytes[0..4], &[0x00, 0x00, 0x01, 0x81]);
        assert_eq!(BlockIndex::read(&mut &bytes[..], 3).unwrap(), index);
    }

    #[test]
    fn test_backwards_entries_rejected() {
        let mut index = BlockIndex::default();
        index.push(IndexEntry::new(100, true).unwrap());
        index.push(IndexEntry::new(50, false).unwrap());
        assert!(matches!(index.block(0), Err(SwdError::IllegalData { .. })));
    }

    #[test]
    fn test_short_table() {
        let err = BlockIndex::read(&mut &[0u8; 6][..], 2).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
    }
}
