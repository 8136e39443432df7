//! LZSS engine configuration.

use swd_core::error::{Result, SwdError};

/// Size of the reference window in bytes.
pub const WINDOW_SIZE: usize = 0x800;

/// Longest match the length code table can express.
pub const MAX_CODE_LENGTH: usize = 275;

/// Farthest offset the offset code table can express.
pub const MAX_CODE_OFFSET: usize = 1696;

/// Shortest match that is ever emitted as a match token.
pub const MIN_MATCH: usize = 2;

/// LZSS engine parameters, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LzssConfig {
    /// Matches of this length or shorter are sent as literals.
    pub break_even: usize,
    /// Longest match searched for.
    pub max_length: usize,
    /// Farthest distance a match may reach back.
    pub max_offset: usize,
}

impl LzssConfig {
    /// Textbook LZSS parameters for a 2 KiB window with 4-bit lengths.
    ///
    /// - break even = (1 + 11 + 4) / 9 = 1
    /// - max length = 2^4 + break even = 17
    /// - max offset = 2^11 - 1 = 2047
    ///
    /// Offsets above 1696 cannot be expressed by the SWD code tables, so
    /// streams produced with this profile fail with
    /// [`SwdError::IllegalConfig`] as soon as such a match is found.
    pub const CLASSIC: Self = Self {
        break_even: 1,
        max_length: 17,
        max_offset: 2047,
    };

    /// Parameters the SWD tool opens its engine with.
    ///
    /// - break even = 1
    /// - max length = 256
    /// - max offset = 0x6A0 (1696, top of the offset code table)
    pub const SWD: Self = Self {
        break_even: 1,
        max_length: 256,
        max_offset: 0x06A0,
    };

    /// Create a validated configuration.
    pub fn new(break_even: usize, max_length: usize, max_offset: usize) -> Result<Self> {
        let config = Self {
            break_even,
            max_length,
            max_offset,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the structural invariants of the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.max_length < self.break_even + 1 || self.max_length < MIN_MATCH {
            return Err(SwdError::illegal_config(format!(
                "max length {} must exceed break even {} and be at least {}",
                self.max_length, self.break_even, MIN_MATCH
            )));
        }
        if self.max_length > u16::MAX as usize {
            return Err(SwdError::illegal_config(format!(
                "max length {} exceeds {}",
                self.max_length,
                u16::MAX
            )));
        }
        if self.max_offset == 0 || self.max_offset >= WINDOW_SIZE {
            return Err(SwdError::illegal_config(format!(
                "max offset {} must be in 1..{}",
                self.max_offset, WINDOW_SIZE
            )));
        }
        Ok(())
    }

    /// Whether every token this configuration can produce is encodable.
    pub fn fits_code_tables(&self) -> bool {
        self.max_length <= MAX_CODE_LENGTH && self.max_offset <= MAX_CODE_OFFSET
    }

    /// Encoder window capacity.
    ///
    /// The window must hold the whole dictionary span plus the look-ahead so
    /// that refilling the look-ahead never overwrites bytes of a string still
    /// in the dictionary.
    pub fn window_size(&self) -> usize {
        (self.max_offset + self.max_length)
            .next_power_of_two()
            .max(WINDOW_SIZE)
    }
}

impl Default for LzssConfig {
    fn default() -> Self {
        Self::SWD
    }
}
