//! Greedy LZSS encoder.
//!
//! The encoder keeps `max_length` bytes of look-ahead in the window. At each
//! step it takes the best match the dictionary found for the current
//! position, emits it (or a literal when it is too short to pay for its
//! offset), and then slides over the consumed bytes: the entry leaving the
//! dictionary span is removed, one input byte refills the look-ahead, and
//! the new position is inserted.

use crate::channel::{ByteSource, TokenSink};
use crate::config::{LzssConfig, MIN_MATCH};
use crate::dictionary::Dictionary;
use crate::token::Token;
use crate::window::Window;
use swd_core::error::Result;

/// Encoder progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    /// The look-ahead has not been primed yet.
    Filling,
    /// Input is still flowing into the look-ahead.
    Matching,
    /// Input is exhausted; the look-ahead shrinks with every token.
    Draining,
    /// The end marker has been emitted.
    Done,
}

/// Counters collected while encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    /// Bytes read from the source.
    pub input_bytes: u64,
    /// Literal tokens emitted.
    pub literals: u64,
    /// Match tokens emitted.
    pub matches: u64,
    /// Bytes covered by match tokens.
    pub match_bytes: u64,
}

/// LZSS encoder session.
#[derive(Debug)]
pub struct LzssEncoder {
    config: LzssConfig,
    window: Window,
    dictionary: Dictionary,
    /// Current window slot.
    position: usize,
    /// Bytes of look-ahead starting at `position`.
    look_ahead: usize,
    input_done: bool,
    state: EncoderState,
    stats: EncoderStats,
}

impl LzssEncoder {
    /// Open an encoder session.
    pub fn new(config: LzssConfig) -> Result<Self> {
        config.validate()?;
        let window_size = config.window_size();

        Ok(Self {
            config,
            window: Window::new(window_size)?,
            dictionary: Dictionary::new(window_size, config.max_length),
            position: 0,
            look_ahead: 0,
            input_done: false,
            state: EncoderState::Filling,
            stats: EncoderStats::default(),
        })
    }

    /// The configuration of this session.
    pub fn config(&self) -> &LzssConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Counters for the stream so far.
    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    /// Prepare for a new, independent stream.
    pub fn reset(&mut self) {
        self.window.clear();
        self.dictionary.clear();
        self.position = 0;
        self.look_ahead = 0;
        self.input_done = false;
        self.state = EncoderState::Filling;
        self.stats = EncoderStats::default();
    }

    /// Encode everything `source` provides, ending with the end marker.
    pub fn shrink<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<EncoderStats>
    where
        S: ByteSource + ?Sized,
        K: TokenSink + ?Sized,
    {
        while self.step(source, sink)? != EncoderState::Done {}
        Ok(self.stats)
    }

    /// Advance by one transition (priming, or one emitted token).
    pub fn step<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<EncoderState>
    where
        S: ByteSource + ?Sized,
        K: TokenSink + ?Sized,
    {
        match self.state {
            EncoderState::Filling => self.prime(source)?,
            EncoderState::Matching | EncoderState::Draining => self.emit(source, sink)?,
            EncoderState::Done => {}
        }
        Ok(self.state)
    }

    fn prime<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        while self.look_ahead < self.config.max_length {
            match source.receive_byte()? {
                Some(byte) => {
                    self.window.write(self.look_ahead, byte);
                    self.look_ahead += 1;
                }
                None => {
                    self.input_done = true;
                    break;
                }
            }
        }
        self.stats.input_bytes = self.look_ahead as u64;

        if self.look_ahead > 0 {
            self.dictionary.insert(&self.window, 0);
        }
        self.state = if self.input_done {
            EncoderState::Draining
        } else {
            EncoderState::Matching
        };
        Ok(())
    }

    fn emit<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<()>
    where
        S: ByteSource + ?Sized,
        K: TokenSink + ?Sized,
    {
        if self.look_ahead <= 1 {
            if self.look_ahead == 1 {
                sink.emit_token(Token::Literal(self.window.byte(self.position)))?;
                self.stats.literals += 1;
                self.look_ahead = 0;
            }
            sink.emit_eof()?;
            self.state = EncoderState::Done;
            return Ok(());
        }

        let length = self.dictionary.best_length().min(self.look_ahead);
        let replace_count = if length <= self.config.break_even || length < MIN_MATCH {
            sink.emit_token(Token::Literal(self.window.byte(self.position)))?;
            self.stats.literals += 1;
            1
        } else {
            let offset = self
                .window
                .wrap(self.position.wrapping_sub(self.dictionary.best_position()));
            sink.emit_token(Token::Match {
                length: length as u16,
                offset: offset as u16,
            })?;
            self.stats.matches += 1;
            self.stats.match_bytes += length as u64;
            length
        };

        for _ in 0..replace_count {
            self.slide(source)?;
        }

        if self.input_done {
            self.state = EncoderState::Draining;
        }
        Ok(())
    }

    /// Move the current position forward by one byte.
    fn slide<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        let leaving = self.position.wrapping_sub(self.config.max_offset);
        self.dictionary.remove(self.window.wrap(leaving));

        let incoming = if self.input_done {
            None
        } else {
            source.receive_byte()?
        };
        match incoming {
            Some(byte) => {
                self.window
                    .write(self.position + self.config.max_length, byte);
                self.stats.input_bytes += 1;
            }
            None => {
                self.input_done = true;
                self.look_ahead -= 1;
            }
        }

        self.position = self.window.wrap(self.position + 1);
        if self.look_ahead > 0 {
            self.dictionary.insert(&self.window, self.position);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::SliceSource;

    fn tokens_for(config: LzssConfig, data: &[u8]) -> Vec<Token> {
        let mut encoder = LzssEncoder::new(config).unwrap();
        let mut tokens = Vec::new();
        encoder
            .shrink(&mut SliceSource::new(data), &mut tokens)
            .unwrap();
        tokens
    }

    /// Expand tokens back to bytes without any window limit.
    fn replay(tokens: &[Token]) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        for token in tokens {
            match *token {
                Token::Eof => break,
                Token::Literal(b) => out.push(b),
                Token::Match { length, offset } => {
                    let start = out.len() - offset as usize;
                    for i in 0..length as usize {
                        out.push(out[start + i]);
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_empty_input_is_just_eof() {
        assert_eq!(tokens_for(LzssConfig::SWD, b""), [Token::Eof]);
    }

    #[test]
    fn test_single_byte() {
        assert_eq!(
            tokens_for(LzssConfig::SWD, b"Z"),
            [Token::Literal(b'Z'), Token::Eof]
        );
    }

    #[test]
    fn test_run_becomes_overlapping_match() {
        let tokens = tokens_for(LzssConfig::SWD, &[b'a'; 40]);
        assert_eq!(tokens[0], Token::Literal(b'a'));
        assert_eq!(
            tokens[1],
            Token::Match {
                length: 39,
                offset: 1
            }
        );
        assert_eq!(tokens[2], Token::Eof);
    }

    #[test]
    fn test_state_transitions() {
        let data = vec![7u8; 600];
        let mut encoder = LzssEncoder::new(LzssConfig::SWD).unwrap();
        let mut source = SliceSource::new(&data);
        let mut tokens = Vec::new();

        assert_eq!(encoder.state(), EncoderState::Filling);
        assert_eq!(
            encoder.step(&mut source, &mut tokens).unwrap(),
            EncoderState::Matching
        );
        while encoder.step(&mut source, &mut tokens).unwrap() == EncoderState::Matching {}
        assert_eq!(encoder.state(), EncoderState::Draining);
        encoder.shrink(&mut source, &mut tokens).unwrap();
        assert_eq!(encoder.state(), EncoderState::Done);
        assert_eq!(encoder.stats().input_bytes, 600);
        assert_eq!(replay(&tokens), data);
    }

    #[test]
    fn test_break_even_boundary() {
        // "abc" repeats exactly three bytes; "abcd" repeats four.
        let config = LzssConfig::new(3, 17, 1696).unwrap();

        let tokens = tokens_for(config, b"abcXabcY");
        assert!(tokens.iter().all(|t| !matches!(t, Token::Match { .. })));

        let tokens = tokens_for(config, b"abcdXabcdY");
        assert!(tokens.contains(&Token::Match {
            length: 4,
            offset: 5
        }));
        assert_eq!(replay(&tokens), b"abcdXabcdY");
    }

    #[test]
    fn test_zero_break_even_still_uses_literals_for_single_bytes() {
        let config = LzssConfig::new(0, 17, 1696).unwrap();
        let tokens = tokens_for(config, b"abab");
        assert_eq!(tokens[0], Token::Literal(b'a'));
        assert_eq!(tokens[1], Token::Literal(b'b'));
        assert_eq!(
            tokens[2],
            Token::Match {
                length: 2,
                offset: 2
            }
        );
    }

    #[test]
    fn test_offsets_stay_in_span() {
        let mut data = Vec::new();
        let mut x = 12345u32;
        for _ in 0..20000 {
            x = x.wrapping_mul(1103515245).wrapping_add(12345);
            data.push(b"abcdefgh"[(x >> 16) as usize % 8]);
        }

        for config in [LzssConfig::SWD, LzssConfig::new(1, 17, 100).unwrap()] {
            let tokens = tokens_for(config, &data);
            for token in &tokens {
                if let Token::Match { length, offset } = *token {
                    assert!(offset as usize <= config.max_offset);
                    assert!(length as usize <= config.max_length);
                }
            }
            assert_eq!(replay(&tokens), data);
        }
    }

    #[test]
    fn test_reset_gives_identical_tokens() {
        let data = b"the quick brown fox jumps over the lazy dog; the quick brown fox";
        let mut encoder = LzssEncoder::new(LzssConfig::SWD).unwrap();

        let mut first = Vec::new();
        encoder
            .shrink(&mut SliceSource::new(data), &mut first)
            .unwrap();
        encoder.reset();
        let mut second = Vec::new();
        encoder
            .shrink(&mut SliceSource::new(data), &mut second)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(replay(&first), data);
    }
}
