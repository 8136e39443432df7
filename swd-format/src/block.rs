//! Block container: independently compressed blocks behind a seek table.
//!
//! Every block is compressed from a clean encoder state, so any block can be
//! expanded on its own. A block whose padded bitstream would not be smaller
//! than the raw bytes is stored raw and flagged as such in the table.

use crate::ContainerStats;
use crate::header::{BlockSize, HEADER_LEN, SwdHeader};
use crate::index::{BlockIndex, ENTRY_LEN, IndexEntry};
use log::{debug, trace};
use std::io::{Read, Seek, SeekFrom, Write};
use swd_core::error::{IoContext, Result, SwdError};
use swd_lzss::{BitOrder, LzssConfig, LzssEncoder, compress_with, decompress};

/// Compressed blocks are zero padded to a multiple of this size.
pub const BLOCK_ALIGN: usize = 4;

/// Bytes stored in the file for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockPayload<'a> {
    /// Zero padded SWD bitstream.
    Packed(Vec<u8>),
    /// The raw block.
    Stored(&'a [u8]),
}

impl BlockPayload<'_> {
    /// Bytes to write.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            BlockPayload::Packed(data) => data,
            BlockPayload::Stored(data) => data,
        }
    }

    /// Whether the payload is a bitstream.
    pub fn is_compressed(&self) -> bool {
        matches!(self, BlockPayload::Packed(_))
    }
}

/// Compress one block with a reset encoder.
///
/// Falls back to the raw bytes when the padded bitstream is not smaller.
pub fn pack_block<'a>(
    encoder: &mut LzssEncoder,
    block: &'a [u8],
    order: BitOrder,
) -> Result<BlockPayload<'a>> {
    let mut packed = compress_with(encoder, block, order)?;
    let padded = packed.len().next_multiple_of(BLOCK_ALIGN);

    if padded < block.len() {
        trace!("block of {} bytes packed to {}", block.len(), padded);
        packed.resize(padded, 0);
        Ok(BlockPayload::Packed(packed))
    } else {
        trace!(
            "block of {} bytes stored raw (packed size {})",
            block.len(),
            padded
        );
        Ok(BlockPayload::Stored(block))
    }
}

fn block_size_of(header: &SwdHeader) -> Result<BlockSize> {
    header
        .block_size()
        .ok_or_else(|| SwdError::illegal_config("header does not describe a block container"))
}

/// Compress `original_len` bytes from `reader` into a block container.
///
/// The seek table is reserved first and filled in once every block has
/// been written, so the writer must be seekable. Offsets are measured from
/// the writer's position on entry.
pub fn shrink_blocks<R, W>(
    reader: &mut R,
    writer: &mut W,
    header: &SwdHeader,
    config: LzssConfig,
) -> Result<ContainerStats>
where
    R: Read,
    W: Write + Seek,
{
    let block_size = block_size_of(header)?;
    let original_len = u64::from(header.original_len());
    let count = BlockIndex::entry_count(original_len, block_size);

    let base = writer.stream_position().on_seek()?;
    header.write(writer)?;
    BlockIndex::write_placeholder(writer, count)?;

    let mut encoder = LzssEncoder::new(config)?;
    let mut index = BlockIndex::with_capacity(count)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(block_size.size_bytes())
        .map_err(|_| SwdError::no_memory(block_size.size_bytes()))?;
    buf.resize(block_size.size_bytes(), 0);

    let mut offset = (HEADER_LEN + count * ENTRY_LEN) as u64;
    let mut remaining = original_len;
    let mut stored_blocks = 0;

    while remaining > 0 {
        let len = remaining.min(block_size.size_bytes() as u64) as usize;
        let block = &mut buf[..len];
        reader.read_exact(block).on_read()?;

        let payload = pack_block(&mut encoder, block, header.order())?;
        index.push(IndexEntry::new(offset, payload.is_compressed())?);
        writer.write_all(payload.as_bytes()).on_write()?;

        if !payload.is_compressed() {
            stored_blocks += 1;
        }
        offset += payload.as_bytes().len() as u64;
        remaining -= len as u64;
    }
    index.push(IndexEntry::new(offset, false)?);

    writer
        .seek(SeekFrom::Start(base + HEADER_LEN as u64))
        .on_seek()?;
    index.write(writer)?;
    writer.seek(SeekFrom::Start(base + offset)).on_seek()?;
    writer.flush().on_write()?;

    debug!(
        "{} bytes in {} blocks of {} ({} stored raw) -> {} bytes",
        original_len,
        index.block_count(),
        block_size,
        stored_blocks,
        offset
    );

    Ok(ContainerStats {
        original_len,
        container_len: offset,
        blocks: index.block_count(),
        stored_blocks,
    })
}

/// Build a block container in memory from already packed blocks.
pub(crate) fn assemble(header: &SwdHeader, payloads: &[BlockPayload<'_>]) -> Result<Vec<u8>> {
    let count = payloads.len() + 1;
    let table_end = HEADER_LEN + count * ENTRY_LEN;
    let data_len: usize = payloads.iter().map(|p| p.as_bytes().len()).sum();

    let mut out = Vec::new();
    out.try_reserve_exact(table_end + data_len)
        .map_err(|_| SwdError::no_memory(table_end + data_len))?;
    header.write(&mut out)?;

    let mut index = BlockIndex::with_capacity(count)?;
    let mut offset = table_end as u64;
    for payload in payloads {
        index.push(IndexEntry::new(offset, payload.is_compressed())?);
        offset += payload.as_bytes().len() as u64;
    }
    index.push(IndexEntry::new(offset, false)?);
    index.write(&mut out)?;

    for payload in payloads {
        out.extend_from_slice(payload.as_bytes());
    }
    Ok(out)
}

/// Compress `data` into an in-memory block container.
pub(crate) fn compress_blocks(
    data: &[u8],
    header: &SwdHeader,
    config: LzssConfig,
) -> Result<Vec<u8>> {
    let block_size = block_size_of(header)?;
    let mut encoder = LzssEncoder::new(config)?;
    let payloads = data
        .chunks(block_size.size_bytes())
        .map(|chunk| pack_block(&mut encoder, chunk, header.order()))
        .collect::<Result<Vec<_>>>()?;
    assemble(header, &payloads)
}

/// Compress `data` into an in-memory block container, one rayon task per
/// block. The output is identical to [`compress_blocks`].
#[cfg(feature = "parallel")]
pub(crate) fn compress_blocks_parallel(
    data: &[u8],
    header: &SwdHeader,
    config: LzssConfig,
) -> Result<Vec<u8>> {
    use rayon::prelude::*;

    let block_size = block_size_of(header)?;
    let order = header.order();
    let payloads = data
        .par_chunks(block_size.size_bytes())
        .map(|chunk| {
            let mut encoder = LzssEncoder::new(config)?;
            pack_block(&mut encoder, chunk, order)
        })
        .collect::<Result<Vec<_>>>()?;
    assemble(header, &payloads)
}

/// Expand a block container whose header has already been read.
///
/// `reader` must be positioned right after the header. Returns the number
/// of bytes written.
pub fn expand_blocks<R, W>(reader: &mut R, writer: &mut W, header: &SwdHeader) -> Result<u64>
where
    R: Read + Seek,
    W: Write,
{
    let block_size = block_size_of(header)?;
    let base = reader
        .stream_position()
        .on_seek()?
        .saturating_sub(HEADER_LEN as u64);
    let original_len = u64::from(header.original_len());
    let count = BlockIndex::entry_count(original_len, block_size);
    let index = BlockIndex::read(reader, count)?;

    let mut packed = Vec::new();
    let mut remaining = original_len;

    for (i, span) in index.blocks().enumerate() {
        let span = span?;
        let block_len = remaining.min(block_size.size_bytes() as u64);

        reader.seek(SeekFrom::Start(base + span.offset)).on_seek()?;
        packed.clear();
        reader
            .by_ref()
            .take(span.stored_len)
            .read_to_end(&mut packed)
            .on_read()?;
        if (packed.len() as u64) < span.stored_len {
            return Err(SwdError::illegal_data(
                span.offset,
                format!(
                    "block {} is truncated ({} of {} bytes)",
                    i,
                    packed.len(),
                    span.stored_len
                ),
            ));
        }

        if span.compressed {
            let data =
                decompress(&packed, header.order(), Some(block_len)).map_err(|e| match e {
                    SwdError::IllegalData { message, .. } => SwdError::illegal_data(
                        span.offset,
                        format!("compressed block {} contains invalid data: {}", i, message),
                    ),
                    other => other,
                })?;
            writer.write_all(&data).on_write()?;
        } else {
            if span.stored_len != block_len {
                return Err(SwdError::illegal_data(
                    span.offset,
                    format!(
                        "stored block {} holds {} bytes, expected {}",
                        i, span.stored_len, block_len
                    ),
                ));
            }
            writer.write_all(&packed).on_write()?;
        }

        trace!(
            "block {}: {} -> {} bytes{}",
            i,
            span.stored_len,
            block_len,
            if span.compressed { "" } else { " (stored)" }
        );
        remaining -= block_len;
    }

    writer.flush().on_write()?;
    debug!(
        "expanded {} blocks into {} bytes",
        index.block_count(),
        original_len
    );
    Ok(original_len)
}
