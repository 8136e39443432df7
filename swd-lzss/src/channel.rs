//! Byte and token channels between the engine and its collaborators.
//!
//! The encoder pulls bytes from a [`ByteSource`] and pushes tokens into a
//! [`TokenSink`]; the decoder pulls tokens from a [`TokenSource`] and pushes
//! bytes into a [`ByteSink`]. The streaming pipeline implements the token
//! side; this module provides the byte side for slices, readers, writers and
//! vectors.

use crate::token::Token;
use swd_core::error::{IoContext, Result, SwdError};
use swd_core::queue::Queue;
use std::io::{Read, Write};

/// Default size of the byte buffers.
pub const DEFAULT_BYTE_BUFFER: usize = 0x2000 + 1024;

/// Supplies input bytes to the encoder.
pub trait ByteSource {
    /// Next byte, or `None` at end of input.
    fn receive_byte(&mut self) -> Result<Option<u8>>;
}

/// Accepts output bytes from the decoder.
pub trait ByteSink {
    /// Write one byte.
    fn send_byte(&mut self, byte: u8) -> Result<()>;

    /// Signal that the stream is complete.
    fn send_eof(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Accepts tokens from the encoder.
pub trait TokenSink {
    /// Emit one token.
    fn emit_token(&mut self, token: Token) -> Result<()>;

    /// Emit the end marker.
    fn emit_eof(&mut self) -> Result<()> {
        self.emit_token(Token::Eof)
    }
}

/// Supplies tokens to the decoder.
pub trait TokenSource {
    /// Next token.
    fn receive_token(&mut self) -> Result<Token>;
}

/// Byte source over an in-memory slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SliceSource<'a> {
    /// Read from `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes handed out so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl ByteSource for SliceSource<'_> {
    fn receive_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.data.get(self.position).copied();
        if byte.is_some() {
            self.position += 1;
        }
        Ok(byte)
    }
}

/// Byte source that refills a buffer from a reader.
#[derive(Debug)]
pub struct ReadSource<R: Read> {
    reader: R,
    buffer: Queue<u8>,
    exhausted: bool,
}

impl<R: Read> ReadSource<R> {
    /// Wrap `reader` with the default buffer size.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_capacity(reader, DEFAULT_BYTE_BUFFER)
    }

    /// Wrap `reader` with a buffer of `capacity` bytes.
    pub fn with_capacity(reader: R, capacity: usize) -> Result<Self> {
        Ok(Self {
            reader,
            buffer: Queue::with_capacity(capacity)?,
            exhausted: false,
        })
    }

    /// Bytes handed out so far.
    pub fn bytes_read(&self) -> u64 {
        self.buffer.consumed()
    }

    /// Consume the source and return the reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn receive_byte(&mut self) -> Result<Option<u8>> {
        if self.buffer.is_empty() && !self.exhausted && self.buffer.fill_from(&mut self.reader)? == 0
        {
            self.exhausted = true;
        }
        Ok(self.buffer.pop())
    }
}

/// Byte sink that drains a buffer into a writer whenever it fills up.
#[derive(Debug)]
pub struct WriteSink<W: Write> {
    writer: W,
    buffer: Queue<u8>,
}

impl<W: Write> WriteSink<W> {
    /// Wrap `writer` with the default buffer size.
    pub fn new(writer: W) -> Result<Self> {
        Self::with_capacity(writer, DEFAULT_BYTE_BUFFER)
    }

    /// Wrap `writer` with a buffer of `capacity` bytes.
    pub fn with_capacity(writer: W, capacity: usize) -> Result<Self> {
        Ok(Self {
            writer,
            buffer: Queue::with_capacity(capacity)?,
        })
    }

    /// Bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.buffer.end_position()
    }

    /// Drain the buffer and return the writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.drain()?;
        Ok(self.writer)
    }

    fn drain(&mut self) -> Result<()> {
        let len = self.buffer.len();
        self.buffer.drain_to(&mut self.writer, len)
    }
}

impl<W: Write> ByteSink for WriteSink<W> {
    fn send_byte(&mut self, byte: u8) -> Result<()> {
        if self.buffer.is_full() {
            self.drain()?;
        }
        let pushed = self.buffer.push(byte);
        debug_assert!(pushed, "byte buffer full after drain");
        Ok(())
    }

    fn send_eof(&mut self) -> Result<()> {
        self.drain()?;
        self.writer.flush().on_write()
    }
}

impl ByteSink for Vec<u8> {
    fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.try_reserve(1).map_err(|_| SwdError::no_memory(self.len() + 1))?;
        self.push(byte);
        Ok(())
    }
}

impl TokenSink for Vec<Token> {
    fn emit_token(&mut self, token: Token) -> Result<()> {
        self.push(token);
        Ok(())
    }
}

impl TokenSource for std::vec::IntoIter<Token> {
    fn receive_token(&mut self) -> Result<Token> {
        self.next()
            .ok_or_else(|| SwdError::illegal_data(0, "token stream ended without end marker"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source() {
        let mut source = SliceSource::new(b"ab");
        assert_eq!(source.receive_byte().unwrap(), Some(b'a'));
        assert_eq!(source.receive_byte().unwrap(), Some(b'b'));
        assert_eq!(source.receive_byte().unwrap(), None);
        assert_eq!(source.position(), 2);
    }

    #[test]
    fn test_read_source_refills() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut source = ReadSource::with_capacity(&data[..], 7).unwrap();
        let mut out = Vec::new();
        while let Some(b) = source.receive_byte().unwrap() {
            out.push(b);
        }
        assert_eq!(out, data);
        assert_eq!(source.bytes_read(), 100);
    }

    #[test]
    fn test_write_sink_drains() {
        let mut sink = WriteSink::with_capacity(Vec::new(), 4).unwrap();
        for b in 0..10u8 {
            sink.send_byte(b).unwrap();
        }
        sink.send_eof().unwrap();
        assert_eq!(sink.bytes_written(), 10);
        assert_eq!(sink.into_inner().unwrap(), (0..10u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_write_sink_single_byte_buffer() {
        let mut sink = WriteSink::with_capacity(Vec::new(), 1).unwrap();
        for &b in b"refill" {
            sink.send_byte(b).unwrap();
        }
        sink.send_eof().unwrap();
        assert_eq!(sink.into_inner().unwrap(), b"refill");
    }
}
