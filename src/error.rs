//! Error types for mtbl tables and sorters.

use std::io;
use thiserror::Error;

/// The result type used throughout mtbl.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for table, sorter and metadata operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred. Never retried internally.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The path does not exist or cannot be opened for reading.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The file is not a valid table (bad footer, magic, index or block).
    #[error("Format error: {0}")]
    Format(String),

    /// A block checksum did not match its contents.
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum computed over the bytes read.
        actual: u32,
    },

    /// `Writer::add` was called with a key not strictly greater than the previous one.
    #[error("Out of order key: {0}")]
    OutOfOrderKey(String),

    /// A construction parameter was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The writer or sorter has already been closed.
    #[error("Already closed: {0}")]
    AlreadyClosed(String),

    /// A compression scheme was not compiled into this build.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Metadata could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Creates a new not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new already closed error.
    pub fn already_closed(msg: impl Into<String>) -> Self {
        Error::AlreadyClosed(msg.into())
    }

    /// Returns true for errors caused by an invalid or corrupt file.
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_) | Error::ChecksumMismatch { .. })
    }
}
