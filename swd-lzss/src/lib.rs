//! # SWD LZSS
//!
//! Pure Rust implementation of the LZSS engine behind the SWD format.
//!
//! The engine is split into small pieces that can be used on their own:
//!
//! - [`window`] / [`dictionary`]: mirrored sliding window and binary tree
//!   match finder
//! - [`encoder`] / [`decoder`]: token state machines
//! - [`codec`]: fixed prefix codes for `(length, offset)` tokens
//! - [`pipeline`]: buffered token packing and unpacking over `Read`/`Write`
//! - [`channel`]: byte and token channel traits with slice, reader and
//!   writer adapters
//!
//! ## Example
//!
//! ```rust
//! use swd_lzss::{BitOrder, LzssConfig, compress, decompress};
//!
//! let data = b"Hello Hello Hello World";
//! let packed = compress(data, LzssConfig::SWD, BitOrder::Standard).unwrap();
//! let unpacked = decompress(&packed, BitOrder::Standard, Some(data.len() as u64)).unwrap();
//! assert_eq!(unpacked, data);
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use swd_lzss::{BitOrder, LzssConfig, compress_stream, decompress_stream};
//! use std::io::Cursor;
//!
//! let data = vec![42u8; 10_000];
//! let mut packed = Vec::new();
//! let stats = compress_stream(&mut Cursor::new(&data), &mut packed, LzssConfig::SWD, BitOrder::Gameboy).unwrap();
//! assert_eq!(stats.input_bytes, 10_000);
//!
//! let mut out = Vec::new();
//! decompress_stream(&mut Cursor::new(&packed), &mut out, BitOrder::Gameboy, None).unwrap();
//! assert_eq!(out, data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod channel;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod dictionary;
pub mod encoder;
pub mod pipeline;
pub mod token;
pub mod window;

use log::debug;
use std::io::{Read, Write};
use swd_core::error::{Result, SwdError};

// Re-exports
pub use channel::{ByteSink, ByteSource, ReadSource, SliceSource, TokenSink, TokenSource, WriteSink};
pub use codec::{BitOrder, TokenCodec};
pub use config::LzssConfig;
pub use decoder::LzssDecoder;
pub use dictionary::Dictionary;
pub use encoder::{EncoderState, EncoderStats, LzssEncoder};
pub use pipeline::{BufferSizes, TokenPacker, TokenUnpacker};
pub use token::Token;

/// Summary of one compressed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Uncompressed bytes.
    pub input_bytes: u64,
    /// Compressed bytes.
    pub output_bytes: u64,
    /// Literal tokens.
    pub literals: u64,
    /// Match tokens.
    pub matches: u64,
}

impl StreamStats {
    fn from_encoder(stats: EncoderStats, output_bytes: u64) -> Self {
        Self {
            input_bytes: stats.input_bytes,
            output_bytes,
            literals: stats.literals,
            matches: stats.matches,
        }
    }

    /// Compressed size as a percentage of the input size.
    pub fn ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            100.0
        } else {
            self.output_bytes as f64 * 100.0 / self.input_bytes as f64
        }
    }
}

/// Compress `data` into a bare SWD bitstream.
pub fn compress(data: &[u8], config: LzssConfig, order: BitOrder) -> Result<Vec<u8>> {
    let mut encoder = LzssEncoder::new(config)?;
    compress_with(&mut encoder, data, order)
}

/// Compress `data` with an existing encoder session, which is reset first.
pub fn compress_with(encoder: &mut LzssEncoder, data: &[u8], order: BitOrder) -> Result<Vec<u8>> {
    encoder.reset();
    let mut packer = TokenPacker::new(Vec::with_capacity(data.len() / 2 + 16), order)?;
    let stats = encoder.shrink(&mut SliceSource::new(data), &mut packer)?;
    let out = packer.finish()?;
    debug!(
        "compressed {} -> {} bytes ({} literals, {} matches)",
        stats.input_bytes,
        out.len(),
        stats.literals,
        stats.matches
    );
    Ok(out)
}

/// Decompress a bare SWD bitstream.
///
/// With `expected_len` set, the stream must produce exactly that many bytes.
pub fn decompress(data: &[u8], order: BitOrder, expected_len: Option<u64>) -> Result<Vec<u8>> {
    let mut decoder = LzssDecoder::new()?;
    decoder.set_expected_len(expected_len);

    let capacity = expected_len.map_or(data.len() * 2, |len| len as usize);
    let mut out = Vec::new();
    out.try_reserve(capacity)
        .map_err(|_| SwdError::no_memory(capacity))?;

    let mut unpacker = TokenUnpacker::new(data, order)?;
    decoder.expand(&mut unpacker, &mut out)?;
    Ok(out)
}

/// Compress everything from `reader` into `writer`.
pub fn compress_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    config: LzssConfig,
    order: BitOrder,
) -> Result<StreamStats> {
    let mut encoder = LzssEncoder::new(config)?;
    let mut source = ReadSource::new(reader)?;
    let mut packer = TokenPacker::new(writer, order)?;

    let stats = encoder.shrink(&mut source, &mut packer)?;
    let summary = StreamStats::from_encoder(stats, packer.bytes_out());
    packer.finish()?;

    debug!(
        "stream compressed {} -> {} bytes ({:.1}%)",
        summary.input_bytes,
        summary.output_bytes,
        summary.ratio()
    );
    Ok(summary)
}

/// Decompress an SWD bitstream from `reader` into `writer`.
///
/// Returns the number of bytes written.
pub fn decompress_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    order: BitOrder,
    expected_len: Option<u64>,
) -> Result<u64> {
    let mut decoder = LzssDecoder::new()?;
    decoder.set_expected_len(expected_len);

    let mut unpacker = TokenUnpacker::new(reader, order)?;
    let mut sink = WriteSink::new(writer)?;
    let produced = decoder.expand(&mut unpacker, &mut sink)?;

    debug!(
        "stream expanded {} -> {} bytes",
        unpacker.bytes_in(),
        produced
    );
    Ok(produced)
}
