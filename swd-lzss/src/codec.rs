//! Prefix codes for SWD tokens.
//!
//! # Length codes
//!
//! | Length  | Bits                       |
//! |---------|----------------------------|
//! | literal | `0` + raw byte             |
//! | 2       | `10`                       |
//! | 3-5     | `11 xx` (length - 2)       |
//! | 6-20    | `11 00 xxxx` (length - 5)  |
//! | 21-275  | `11 00 0000` + raw byte (length - 20) |
//! | EOF     | `11 00 0000` + raw byte 0  |
//!
//! # Offset codes
//!
//! | Offset    | Bits                     |
//! |-----------|--------------------------|
//! | 1-32      | `00` + 5 bits            |
//! | 33-160    | `01` + 7 bits            |
//! | 161-672   | `10` + 9 bit payload     |
//! | 673-1696  | `11` + 10 bit payload    |
//!
//! The 9 and 10 bit payloads are split into a raw byte and a 1 or 2 bit
//! remainder, in an order chosen by [`BitOrder`].

use crate::config::{MAX_CODE_LENGTH, MAX_CODE_OFFSET, MIN_MATCH};
use crate::token::Token;
use swd_core::bitstream::{BitPacker, BitUnpacker, ByteFeed};
use swd_core::error::{Result, SwdError};

/// Most bytes a single token can add to a stream (two bit slots plus two
/// raw bytes).
pub const MAX_TOKEN_BYTES: usize = 4;

/// Order of the raw byte and the remainder bits in wide offset codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitOrder {
    /// Raw byte holds the high payload bits and comes first.
    #[default]
    Standard,
    /// Remainder bits hold the high payload bits and come first; the raw
    /// byte is the low eight bits.
    Gameboy,
}

impl BitOrder {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Gameboy => "gameboy",
        }
    }
}

/// Encodes and decodes tokens with the fixed SWD prefix codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenCodec {
    order: BitOrder,
}

impl TokenCodec {
    /// Create a codec for the given bit order.
    pub fn new(order: BitOrder) -> Self {
        Self { order }
    }

    /// The bit order in use.
    pub fn order(&self) -> BitOrder {
        self.order
    }

    /// Append the code for `token` to `packer`.
    ///
    /// Lengths and offsets outside the code tables are rejected with
    /// [`SwdError::IllegalConfig`].
    pub fn encode(&self, packer: &mut BitPacker, token: Token) -> Result<()> {
        match token {
            Token::Eof => {
                packer.send_bits(8, 0xC0)?;
                packer.send_byte(0)
            }
            Token::Literal(byte) => {
                packer.send_bits(1, 0)?;
                packer.send_byte(byte)
            }
            Token::Match { length, offset } => {
                self.encode_length(packer, length as usize)?;
                self.encode_offset(packer, offset as usize)
            }
        }
    }

    fn encode_length(&self, packer: &mut BitPacker, length: usize) -> Result<()> {
        match length {
            2 => packer.send_bits(2, 0b10),
            3..=5 => packer.send_bits(4, 0b1100 + (length - 2) as u32),
            6..=20 => packer.send_bits(8, 0xC0 + (length - 5) as u32),
            21..=MAX_CODE_LENGTH => {
                packer.send_bits(8, 0xC0)?;
                packer.send_byte((length - 20) as u8)
            }
            _ => Err(SwdError::illegal_config(format!(
                "match length {} outside {}..={}",
                length, MIN_MATCH, MAX_CODE_LENGTH
            ))),
        }
    }

    fn encode_offset(&self, packer: &mut BitPacker, offset: usize) -> Result<()> {
        match offset {
            1..=32 => {
                packer.send_bits(2, 0)?;
                packer.send_bits(5, (offset - 1) as u32)
            }
            33..=160 => {
                packer.send_bits(2, 1)?;
                packer.send_bits(7, (offset - 33) as u32)
            }
            161..=672 => {
                packer.send_bits(2, 2)?;
                self.encode_wide(packer, (offset - 161) as u32, 1)
            }
            673..=MAX_CODE_OFFSET => {
                packer.send_bits(2, 3)?;
                self.encode_wide(packer, (offset - 673) as u32, 2)
            }
            _ => Err(SwdError::illegal_config(format!(
                "match offset {} outside 1..={}",
                offset, MAX_CODE_OFFSET
            ))),
        }
    }

    /// Send an `8 + extra` bit payload as a raw byte plus `extra` bits.
    fn encode_wide(&self, packer: &mut BitPacker, payload: u32, extra: u8) -> Result<()> {
        match self.order {
            BitOrder::Standard => {
                packer.send_byte((payload >> extra) as u8)?;
                packer.send_bits(extra, payload & ((1 << extra) - 1))
            }
            BitOrder::Gameboy => {
                packer.send_bits(extra, payload >> 8)?;
                packer.send_byte((payload & 0xFF) as u8)
            }
        }
    }

    /// Read the next token from `feed`.
    pub fn decode<F: ByteFeed + ?Sized>(
        &self,
        unpacker: &mut BitUnpacker,
        feed: &mut F,
    ) -> Result<Token> {
        if unpacker.recv_bits(feed, 1)? == 0 {
            return Ok(Token::Literal(unpacker.recv_byte(feed)?));
        }

        let length = if unpacker.recv_bits(feed, 1)? == 0 {
            2
        } else {
            match unpacker.recv_bits(feed, 2)? {
                0 => match unpacker.recv_bits(feed, 4)? {
                    0 => match unpacker.recv_byte(feed)? {
                        0 => return Ok(Token::Eof),
                        byte => byte as u16 + 20,
                    },
                    nibble => nibble as u16 + 5,
                },
                short => short as u16 + 2,
            }
        };

        let offset = match unpacker.recv_bits(feed, 2)? {
            0 => unpacker.recv_bits(feed, 5)? + 1,
            1 => unpacker.recv_bits(feed, 7)? + 33,
            2 => self.decode_wide(unpacker, feed, 1)? + 161,
            _ => self.decode_wide(unpacker, feed, 2)? + 673,
        };

        Ok(Token::Match {
            length,
            offset: offset as u16,
        })
    }

    fn decode_wide<F: ByteFeed + ?Sized>(
        &self,
        unpacker: &mut BitUnpacker,
        feed: &mut F,
        extra: u8,
    ) -> Result<u32> {
        match self.order {
            BitOrder::Standard => {
                let high = unpacker.recv_byte(feed)? as u32;
                let low = unpacker.recv_bits(feed, extra)?;
                Ok((high << extra) | low)
            }
            BitOrder::Gameboy => {
                let high = unpacker.recv_bits(feed, extra)?;
                let low = unpacker.recv_byte(feed)? as u32;
                Ok((high << 8) | low)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all(order: BitOrder, tokens: &[Token]) -> Vec<u8> {
        let codec = TokenCodec::new(order);
        let mut packer = BitPacker::new().unwrap();
        for &token in tokens {
            codec.encode(&mut packer, token).unwrap();
        }
        packer.flush();
        packer.output().to_vec()
    }

    fn decode_all(order: BitOrder, data: &[u8], count: usize) -> Vec<Token> {
        let codec = TokenCodec::new(order);
        let mut unpacker = BitUnpacker::new();
        let mut input = data;
        (0..count)
            .map(|_| codec.decode(&mut unpacker, &mut input).unwrap())
            .collect()
    }

    #[test]
    fn test_literal_and_eof_bytes() {
        let data = encode_all(BitOrder::Standard, &[Token::Literal(b'A'), Token::Eof]);
        // The literal flag and seven EOF bits fill the first slot; the last
        // EOF bit opens a second slot after the literal byte.
        assert_eq!(data, [0b0000_0110, b'A', 0x00, 0x00]);
        assert_eq!(
            decode_all(BitOrder::Standard, &data, 2),
            [Token::Literal(b'A'), Token::Eof]
        );
    }

    #[test]
    fn test_short_match_code() {
        let data = encode_all(
            BitOrder::Standard,
            &[Token::Match {
                length: 2,
                offset: 1,
            }],
        );
        // 10 00 00000 -> nine bits, one spills into a second slot.
        assert_eq!(data, [0b0000_0001, 0]);
    }

    #[test]
    fn test_wide_offset_byte_order() {
        let token = Token::Match {
            length: 2,
            offset: 161 + 0x1A5,
        };
        let standard = encode_all(BitOrder::Standard, &[token]);
        let gameboy = encode_all(BitOrder::Gameboy, &[token]);

        // Standard: raw byte is payload >> 1; Gameboy: raw byte is payload & 0xFF.
        assert_eq!(standard[1], (0x1A5 >> 1) as u8);
        assert_eq!(gameboy[1], 0xA5);
        assert_ne!(standard, gameboy);

        assert_eq!(decode_all(BitOrder::Standard, &standard, 1), [token]);
        assert_eq!(decode_all(BitOrder::Gameboy, &gameboy, 1), [token]);
    }

    #[test]
    fn test_table_boundaries_roundtrip() {
        let lengths = [2u16, 3, 5, 6, 20, 21, 275];
        let offsets = [1u16, 32, 33, 160, 161, 672, 673, 1696];

        for order in [BitOrder::Standard, BitOrder::Gameboy] {
            let mut tokens = vec![Token::Literal(0), Token::Literal(0xFF)];
            for &length in &lengths {
                for &offset in &offsets {
                    tokens.push(Token::Match { length, offset });
                }
            }
            tokens.push(Token::Eof);

            let data = encode_all(order, &tokens);
            assert_eq!(decode_all(order, &data, tokens.len()), tokens);
        }
    }

    #[test]
    fn test_rejects_out_of_table_tokens() {
        let codec = TokenCodec::default();
        let mut packer = BitPacker::new().unwrap();

        for token in [
            Token::Match {
                length: 276,
                offset: 1,
            },
            Token::Match {
                length: 1,
                offset: 1,
            },
            Token::Match {
                length: 2,
                offset: 1697,
            },
            Token::Match {
                length: 2,
                offset: 0,
            },
        ] {
            assert!(matches!(
                codec.encode(&mut packer, token),
                Err(SwdError::IllegalConfig { .. })
            ));
        }
    }

    #[test]
    fn test_truncated_code_is_illegal_data() {
        let data = encode_all(
            BitOrder::Standard,
            &[Token::Match {
                length: 100,
                offset: 1000,
            }],
        );
        let codec = TokenCodec::default();
        let mut unpacker = BitUnpacker::new();
        let mut input = &data[..data.len() - 1];
        assert!(matches!(
            codec.decode(&mut unpacker, &mut input),
            Err(SwdError::IllegalData { .. })
        ));
    }
}
