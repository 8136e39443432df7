//! Whole-file container: the header followed by a single bitstream.

use crate::ContainerStats;
use crate::header::{HEADER_LEN, SwdHeader};
use log::debug;
use std::io::{Read, Write};
use swd_core::error::{Result, SwdError};
use swd_lzss::{LzssConfig, compress_stream, decompress_stream};

/// Compress everything from `reader` into a whole-file container.
///
/// The reader must deliver exactly the length recorded in `header`.
pub fn shrink_whole<R, W>(
    reader: &mut R,
    writer: &mut W,
    header: &SwdHeader,
    config: LzssConfig,
) -> Result<ContainerStats>
where
    R: Read,
    W: Write,
{
    header.write(writer)?;
    let stats = compress_stream(reader, writer, config, header.order())?;

    let original_len = u64::from(header.original_len());
    if stats.input_bytes != original_len {
        return Err(SwdError::illegal_data(
            stats.input_bytes,
            format!(
                "read {} bytes but the header records {}",
                stats.input_bytes, original_len
            ),
        ));
    }

    debug!(
        "whole file: {} -> {} bytes ({} literals, {} matches)",
        original_len, stats.output_bytes, stats.literals, stats.matches
    );
    Ok(ContainerStats {
        original_len,
        container_len: HEADER_LEN as u64 + stats.output_bytes,
        blocks: 0,
        stored_blocks: 0,
    })
}

/// Expand a whole-file container whose header has already been read.
///
/// Returns the number of bytes written, which always equals the header's
/// length.
pub fn expand_whole<R, W>(reader: &mut R, writer: &mut W, header: &SwdHeader) -> Result<u64>
where
    R: Read,
    W: Write,
{
    header.check_whole()?;
    decompress_stream(
        reader,
        writer,
        header.order(),
        Some(u64::from(header.original_len())),
    )
}
