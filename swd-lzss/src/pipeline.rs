//! Streaming conversion between tokens and packed bytes.
//!
//! [`TokenPacker`] collects tokens in a queue of `(length, offset)` pairs,
//! with literal bytes kept apart in a side queue, and converts a whole batch
//! to bits whenever the token queue fills up. Packed bytes are drained to
//! the writer up to, but not including, the open bit slot.
//!
//! [`TokenUnpacker`] refills its input queue whenever fewer than
//! [`LOW_WATER_MARK`] bytes remain, so a token never has to be decoded
//! across a refill, and decodes batches of tokens into its own queue.

use crate::channel::{TokenSink, TokenSource};
use crate::codec::{BitOrder, MAX_TOKEN_BYTES, TokenCodec};
use crate::token::Token;
use std::io::{Read, Write};
use swd_core::bitstream::{BitPacker, BitUnpacker};
use swd_core::error::{IoContext, Result, SwdError};
use swd_core::queue::Queue;

/// Input bytes the unpacker keeps buffered before decoding a token.
pub const LOW_WATER_MARK: usize = 2 * MAX_TOKEN_BYTES;

/// Capacities of the pipeline buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSizes {
    /// Raw byte buffers (unpacker input).
    pub bytes: usize,
    /// Token pair queue and the literal side queue.
    pub tokens: usize,
    /// Packed output kept before draining to the writer.
    pub output: usize,
}

impl Default for BufferSizes {
    fn default() -> Self {
        Self {
            bytes: 0x2000 + 1024,
            tokens: 0x2000 + 1024,
            output: 0x2000 + 1024,
        }
    }
}

impl BufferSizes {
    /// Tiny buffers that force a refill or drain every few tokens.
    pub fn tiny() -> Self {
        Self {
            bytes: LOW_WATER_MARK,
            tokens: 2,
            output: 1,
        }
    }
}

/// Token sink that packs tokens into an SWD bitstream on a writer.
#[derive(Debug)]
pub struct TokenPacker<W: Write> {
    writer: W,
    codec: TokenCodec,
    tokens: Queue<(u16, u16)>,
    literals: Queue<u8>,
    packer: BitPacker,
    drain_threshold: usize,
    tokens_packed: u64,
    finished: bool,
}

impl<W: Write> TokenPacker<W> {
    /// Create a packer with default buffer sizes.
    pub fn new(writer: W, order: BitOrder) -> Result<Self> {
        Self::with_sizes(writer, order, BufferSizes::default())
    }

    /// Create a packer with explicit buffer sizes.
    pub fn with_sizes(writer: W, order: BitOrder, sizes: BufferSizes) -> Result<Self> {
        Ok(Self {
            writer,
            codec: TokenCodec::new(order),
            tokens: Queue::with_capacity(sizes.tokens)?,
            literals: Queue::with_capacity(sizes.tokens)?,
            packer: BitPacker::with_capacity(sizes.output + MAX_TOKEN_BYTES)?,
            drain_threshold: sizes.output.max(1),
            tokens_packed: 0,
            finished: false,
        })
    }

    /// Bytes of packed output produced so far.
    pub fn bytes_out(&self) -> u64 {
        self.packer.bytes_produced()
    }

    /// Tokens converted to bits so far.
    pub fn tokens_packed(&self) -> u64 {
        self.tokens_packed
    }

    /// Emit the end marker if needed and return the writer.
    pub fn finish(mut self) -> Result<W> {
        if !self.finished {
            self.emit_eof()?;
        }
        Ok(self.writer)
    }

    /// Convert every queued token to bits and drain what is ready.
    fn pack(&mut self) -> Result<()> {
        while let Some((length, offset)) = self.tokens.pop() {
            let token = if length == 1 {
                let byte = self.literals.pop().ok_or_else(|| {
                    SwdError::illegal_data(self.tokens_packed, "literal queue out of step")
                })?;
                Token::Literal(byte)
            } else {
                Token::from_pair(length, offset)
            };
            self.codec.encode(&mut self.packer, token)?;
            self.tokens_packed += 1;

            if self.packer.ready_len() >= self.drain_threshold {
                self.packer.drain_ready(&mut self.writer)?;
            }
        }
        Ok(())
    }
}

impl<W: Write> TokenSink for TokenPacker<W> {
    fn emit_token(&mut self, token: Token) -> Result<()> {
        if self.tokens.is_full() {
            self.pack()?;
        }
        let pushed = match token {
            Token::Literal(byte) => self.literals.push(byte) && self.tokens.push((1, 0)),
            other => self.tokens.push(other.to_pair()),
        };
        debug_assert!(pushed, "token queue full after packing");
        Ok(())
    }

    fn emit_eof(&mut self) -> Result<()> {
        self.emit_token(Token::Eof)?;
        self.pack()?;
        self.packer.finish(&mut self.writer)?;
        self.writer.flush().on_write()?;
        self.finished = true;
        Ok(())
    }
}

/// Token source that decodes an SWD bitstream from a reader.
#[derive(Debug)]
pub struct TokenUnpacker<R: Read> {
    reader: R,
    codec: TokenCodec,
    input: Queue<u8>,
    unpacker: BitUnpacker,
    tokens: Queue<(u16, u16)>,
    literals: Queue<u8>,
    input_done: bool,
    eof_seen: bool,
}

impl<R: Read> TokenUnpacker<R> {
    /// Create an unpacker with default buffer sizes.
    pub fn new(reader: R, order: BitOrder) -> Result<Self> {
        Self::with_sizes(reader, order, BufferSizes::default())
    }

    /// Create an unpacker with explicit buffer sizes.
    pub fn with_sizes(reader: R, order: BitOrder, sizes: BufferSizes) -> Result<Self> {
        Ok(Self {
            reader,
            codec: TokenCodec::new(order),
            input: Queue::with_capacity(sizes.bytes.max(LOW_WATER_MARK))?,
            unpacker: BitUnpacker::new(),
            tokens: Queue::with_capacity(sizes.tokens)?,
            literals: Queue::with_capacity(sizes.tokens)?,
            input_done: false,
            eof_seen: false,
        })
    }

    /// Compressed bytes decoded so far.
    pub fn bytes_in(&self) -> u64 {
        self.unpacker.bytes_read()
    }

    /// Return the reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn refill(&mut self) -> Result<()> {
        while !self.input_done && self.input.len() < LOW_WATER_MARK {
            if self.input.fill_from(&mut self.reader)? == 0 {
                self.input_done = true;
            }
        }
        Ok(())
    }

    /// Decode tokens until the queue is full or the end marker is found.
    fn decode_batch(&mut self) -> Result<()> {
        while !self.tokens.is_full() && !self.eof_seen {
            if self.input.len() < LOW_WATER_MARK {
                self.refill()?;
            }
            let token = self.codec.decode(&mut self.unpacker, &mut self.input)?;
            let pushed = match token {
                Token::Literal(byte) => self.literals.push(byte) && self.tokens.push((1, 0)),
                Token::Eof => {
                    self.unpacker.flush();
                    self.eof_seen = true;
                    self.tokens.push((0, 0))
                }
                other => self.tokens.push(other.to_pair()),
            };
            debug_assert!(pushed, "token queue overflow while decoding");
        }
        Ok(())
    }
}

impl<R: Read> TokenSource for TokenUnpacker<R> {
    fn receive_token(&mut self) -> Result<Token> {
        if self.tokens.is_empty() {
            if self.eof_seen {
                return Err(SwdError::illegal_data(
                    self.unpacker.bytes_read(),
                    "read past the end marker",
                ));
            }
            self.decode_batch()?;
        }

        match self.tokens.pop() {
            Some((1, _)) => {
                let byte = self.literals.pop().ok_or_else(|| {
                    SwdError::illegal_data(self.unpacker.bytes_read(), "literal queue out of step")
                })?;
                Ok(Token::Literal(byte))
            }
            Some((length, offset)) => Ok(Token::from_pair(length, offset)),
            None => Err(SwdError::illegal_data(
                self.unpacker.bytes_read(),
                "no tokens decoded",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tokens() -> Vec<Token> {
        let mut tokens = Vec::new();
        for i in 0..50u16 {
            tokens.push(Token::Literal(i as u8));
            tokens.push(Token::Match {
                length: 2 + i % 40,
                offset: 1 + i * 30,
            });
        }
        tokens.push(Token::Eof);
        tokens
    }

    fn pack(tokens: &[Token], order: BitOrder, sizes: BufferSizes) -> Vec<u8> {
        let mut packer = TokenPacker::with_sizes(Vec::new(), order, sizes).unwrap();
        for &token in tokens {
            if token.is_eof() {
                packer.emit_eof().unwrap();
            } else {
                packer.emit_token(token).unwrap();
            }
        }
        packer.finish().unwrap()
    }

    fn unpack(data: &[u8], order: BitOrder, sizes: BufferSizes) -> Vec<Token> {
        let mut unpacker = TokenUnpacker::with_sizes(data, order, sizes).unwrap();
        let mut tokens = Vec::new();
        loop {
            let token = unpacker.receive_token().unwrap();
            tokens.push(token);
            if token.is_eof() {
                return tokens;
            }
        }
    }

    #[test]
    fn test_buffer_sizes_do_not_change_output() {
        let tokens = sample_tokens();
        for order in [BitOrder::Standard, BitOrder::Gameboy] {
            let big = pack(&tokens, order, BufferSizes::default());
            let small = pack(&tokens, order, BufferSizes::tiny());
            assert_eq!(big, small);

            assert_eq!(unpack(&big, order, BufferSizes::default()), tokens);
            assert_eq!(unpack(&big, order, BufferSizes::tiny()), tokens);
        }
    }

    #[test]
    fn test_finish_emits_end_marker() {
        let packer = TokenPacker::new(Vec::new(), BitOrder::Standard).unwrap();
        let data = packer.finish().unwrap();
        assert_eq!(data, [0x03, 0x00]);
    }

    #[test]
    fn test_truncated_stream() {
        let data = pack(&sample_tokens(), BitOrder::Standard, BufferSizes::default());
        let truncated = &data[..data.len() / 2];
        let mut unpacker =
            TokenUnpacker::with_sizes(truncated, BitOrder::Standard, BufferSizes::tiny()).unwrap();
        let result = (0..200).try_for_each(|_| unpacker.receive_token().map(|_| ()));
        assert!(matches!(result, Err(SwdError::IllegalData { .. })));
    }
}
