//! LZSS decoder.

use crate::channel::{ByteSink, TokenSource};
use crate::token::Token;
use swd_core::error::{Result, SwdError};
use swd_core::ringbuffer::RingBuffer;

/// LZSS decoder session using a ring buffer for history.
#[derive(Debug)]
pub struct LzssDecoder {
    /// Ring buffer for history.
    ring: RingBuffer,
    /// Bytes produced in the current stream.
    produced: u64,
    /// Exact stream length, when the container knows it.
    expected: Option<u64>,
}

impl LzssDecoder {
    /// Create a decoder for streams of unknown length.
    pub fn new() -> Result<Self> {
        Ok(Self {
            ring: RingBuffer::swd()?,
            produced: 0,
            expected: None,
        })
    }

    /// Create a decoder that requires the stream to produce exactly
    /// `expected` bytes.
    pub fn with_expected_len(expected: u64) -> Result<Self> {
        let mut decoder = Self::new()?;
        decoder.expected = Some(expected);
        Ok(decoder)
    }

    /// Change the required length for the next stream.
    pub fn set_expected_len(&mut self, expected: Option<u64>) {
        self.expected = expected;
    }

    /// Bytes produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Reset the decoder.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.produced = 0;
    }

    /// Decode tokens until the end marker, writing bytes to `sink`.
    ///
    /// Returns the number of bytes produced.
    pub fn expand<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<u64>
    where
        S: TokenSource + ?Sized,
        K: ByteSink + ?Sized,
    {
        loop {
            match source.receive_token()? {
                Token::Eof => {
                    if let Some(expected) = self.expected {
                        if self.produced != expected {
                            return Err(SwdError::illegal_data(
                                self.produced,
                                format!(
                                    "end marker after {} of {} bytes",
                                    self.produced, expected
                                ),
                            ));
                        }
                    }
                    sink.send_eof()?;
                    return Ok(self.produced);
                }
                Token::Literal(byte) => {
                    self.check_room(1)?;
                    self.ring.write_byte(byte);
                    sink.send_byte(byte)?;
                    self.produced += 1;
                }
                Token::Match { length, offset } => {
                    if offset == 0 || offset as usize > self.ring.len() {
                        return Err(SwdError::illegal_data(
                            self.produced,
                            format!(
                                "offset {} reaches before the start of the stream",
                                offset
                            ),
                        ));
                    }
                    self.check_room(length as u64)?;
                    self.ring
                        .copy_from_history(offset as usize, length as usize, |b| {
                            sink.send_byte(b)
                        })?;
                    self.produced += length as u64;
                }
            }
        }
    }

    fn check_room(&self, count: u64) -> Result<()> {
        match self.expected {
            Some(expected) if self.produced + count > expected => Err(SwdError::illegal_data(
                self.produced,
                format!("stream overruns its length of {} bytes", expected),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(decoder: &mut LzssDecoder, tokens: Vec<Token>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        decoder.expand(&mut tokens.into_iter(), &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_literals_and_overlap() {
        let mut decoder = LzssDecoder::new().unwrap();
        let out = expand(
            &mut decoder,
            vec![
                Token::Literal(b'A'),
                Token::Literal(b'B'),
                Token::Match {
                    length: 5,
                    offset: 2,
                },
                Token::Eof,
            ],
        )
        .unwrap();
        assert_eq!(out, b"ABABABA");
        assert_eq!(decoder.produced(), 7);
    }

    #[test]
    fn test_offset_before_start() {
        let mut decoder = LzssDecoder::new().unwrap();
        let err = expand(
            &mut decoder,
            vec![
                Token::Literal(b'A'),
                Token::Match {
                    length: 2,
                    offset: 2,
                },
                Token::Eof,
            ],
        )
        .unwrap_err();
        assert!(matches!(err, SwdError::IllegalData { .. }));
    }

    #[test]
    fn test_early_end_marker_rejected() {
        let mut decoder = LzssDecoder::with_expected_len(3).unwrap();
        let err = expand(
            &mut decoder,
            vec![Token::Literal(b'A'), Token::Literal(b'B'), Token::Eof],
        )
        .unwrap_err();
        assert!(matches!(err, SwdError::IllegalData { .. }));
    }

    #[test]
    fn test_overrun_rejected() {
        let mut decoder = LzssDecoder::with_expected_len(2).unwrap();
        let err = expand(
            &mut decoder,
            vec![
                Token::Literal(b'A'),
                Token::Match {
                    length: 4,
                    offset: 1,
                },
                Token::Eof,
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("overruns"));
    }

    #[test]
    fn test_missing_end_marker() {
        let mut decoder = LzssDecoder::new().unwrap();
        assert!(expand(&mut decoder, vec![Token::Literal(1)]).is_err());
    }

    #[test]
    fn test_history_wraps() {
        let mut tokens: Vec<Token> = (0..2048u32).map(|i| Token::Literal((i % 251) as u8)).collect();
        tokens.push(Token::Match {
            length: 10,
            offset: 1696,
        });
        tokens.push(Token::Eof);

        let mut decoder = LzssDecoder::new().unwrap();
        let out = expand(&mut decoder, tokens).unwrap();
        assert_eq!(out.len(), 2058);
        assert_eq!(&out[2048..], &out[2048 - 1696..2048 - 1696 + 10]);
    }
}
