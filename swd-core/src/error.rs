//! Error types for SWD operations.
//!
//! Every stage of the engine returns [`Result`]; the error kinds mirror the
//! failure classes of the compressor: allocation, the three I/O directions,
//! malformed input, missing or unusable files, and encoder configurations
//! that the fixed code tables cannot express.

use std::io;
use thiserror::Error;

/// The main error type for SWD operations.
#[derive(Debug, Error)]
pub enum SwdError {
    /// A buffer allocation failed.
    #[error("Out of memory: cannot allocate {requested} bytes")]
    NoMemory {
        /// Number of bytes that were requested.
        requested: usize,
    },

    /// Reading from the input collaborator failed.
    #[error("Read error: {0}")]
    IoRead(#[source] io::Error),

    /// Writing to the output collaborator failed.
    #[error("Write error: {0}")]
    IoWrite(#[source] io::Error),

    /// Repositioning a stream failed.
    #[error("Seek error: {0}")]
    IoSeek(#[source] io::Error),

    /// The decoder met data outside the legal token ranges, or a size check
    /// failed.
    #[error("Illegal data at offset {offset}: {message}")]
    IllegalData {
        /// Byte position where the problem was found.
        offset: u64,
        /// Description of the problem.
        message: String,
    },

    /// Missing input, bad signature, or an unusable output path.
    #[error("{message}: {path}")]
    NoFile {
        /// The offending path.
        path: String,
        /// Description of the problem.
        message: String,
    },

    /// The encoder was asked to produce something the code tables cannot
    /// represent.
    #[error("Illegal configuration: {message}")]
    IllegalConfig {
        /// Description of the problem.
        message: String,
    },
}

/// Result type alias for SWD operations.
pub type Result<T> = std::result::Result<T, SwdError>;

impl SwdError {
    /// Create an out of memory error.
    pub fn no_memory(requested: usize) -> Self {
        Self::NoMemory { requested }
    }

    /// Create an illegal data error.
    pub fn illegal_data(offset: u64, message: impl Into<String>) -> Self {
        Self::IllegalData {
            offset,
            message: message.into(),
        }
    }

    /// Create a missing/unusable file error.
    pub fn no_file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NoFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an illegal configuration error.
    pub fn illegal_config(message: impl Into<String>) -> Self {
        Self::IllegalConfig {
            message: message.into(),
        }
    }

    /// Whether a batch run must stop after this error instead of moving on
    /// to the next file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NoMemory { .. } | Self::IllegalConfig { .. })
    }

    /// Short name of the error kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NoMemory { .. } => "NoMemory",
            Self::IoRead(_) => "IoRead",
            Self::IoWrite(_) => "IoWrite",
            Self::IoSeek(_) => "IoSeek",
            Self::IllegalData { .. } => "IllegalData",
            Self::NoFile { .. } => "NoFile",
            Self::IllegalConfig { .. } => "IllegalConfig",
        }
    }
}

/// Attach the direction of an I/O failure to an [`io::Result`].
///
/// ```
/// use swd_core::error::{IoContext, SwdError};
/// use std::io::Read;
///
/// let mut buf = [0u8; 4];
/// let err = (&[1u8, 2][..]).read_exact(&mut buf).on_read().unwrap_err();
/// assert!(matches!(err, SwdError::IoRead(_)));
/// ```
pub trait IoContext<T> {
    /// Map the error to [`SwdError::IoRead`].
    fn on_read(self) -> Result<T>;
    /// Map the error to [`SwdError::IoWrite`].
    fn on_write(self) -> Result<T>;
    /// Map the error to [`SwdError::IoSeek`].
    fn on_seek(self) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn on_read(self) -> Result<T> {
        self.map_err(SwdError::IoRead)
    }

    fn on_write(self) -> Result<T> {
        self.map_err(SwdError::IoWrite)
    }

    fn on_seek(self) -> Result<T> {
        self.map_err(SwdError::IoSeek)
    }
}
