//! LZSS tokens.

/// One unit of the token channel.
///
/// On the wire a token is a `(length, offset)` pair: length 0 is the end
/// marker, length 1 carries a literal byte in the offset field, and longer
/// lengths copy from `offset` bytes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// End of the stream.
    Eof,
    /// A literal byte.
    Literal(u8),
    /// A copy of previously produced data.
    Match {
        /// Number of bytes to copy (at least 2).
        length: u16,
        /// Distance back from the current output position (at least 1).
        offset: u16,
    },
}

impl Token {
    /// Build a token from its `(length, offset)` pair form.
    pub fn from_pair(length: u16, offset: u16) -> Self {
        match length {
            0 => Self::Eof,
            1 => Self::Literal(offset as u8),
            _ => Self::Match { length, offset },
        }
    }

    /// The `(length, offset)` pair form of this token.
    pub fn to_pair(self) -> (u16, u16) {
        match self {
            Self::Eof => (0, 0),
            Self::Literal(byte) => (1, byte as u16),
            Self::Match { length, offset } => (length, offset),
        }
    }

    /// Number of output bytes this token produces.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Eof => 0,
            Self::Literal(_) => 1,
            Self::Match { length, .. } => *length as usize,
        }
    }

    /// Check if this is the end marker.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_form() {
        assert_eq!(Token::from_pair(0, 0), Token::Eof);
        assert_eq!(Token::from_pair(1, 0x41), Token::Literal(b'A'));
        assert_eq!(
            Token::from_pair(3, 10),
            Token::Match {
                length: 3,
                offset: 10
            }
        );
        assert_eq!(Token::Literal(0xFF).to_pair(), (1, 0xFF));
        assert_eq!(Token::Eof.to_pair(), (0, 0));
    }

    #[test]
    fn test_output_len() {
        assert_eq!(Token::Eof.output_len(), 0);
        assert_eq!(Token::Literal(0).output_len(), 1);
        assert_eq!(
            Token::Match {
                length: 275,
                offset: 1
            }
            .output_len(),
            275
        );
    }
}
