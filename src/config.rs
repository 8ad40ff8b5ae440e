//! Configuration options for table writers and sorters.

use crate::error::{Error, Result};
use crate::sorter::MergePolicy;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default data block size (8KB).
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Default number of entries between restart points.
pub const DEFAULT_RESTART_INTERVAL: usize = 16;

/// Default memory budget of a sorter before it spills a run (1GB).
pub const DEFAULT_SORTER_MAX_MEMORY: usize = 1024 * 1024 * 1024;

/// Compression algorithms for data blocks.
///
/// The discriminants are written to disk and must never be renumbered.
/// New schemes are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression.
    #[default]
    None = 0,

    /// Snappy compression (fast, moderate compression ratio).
    Snappy = 1,

    /// Zlib (deflate) compression (slower, better compression ratio).
    Zlib = 2,

    /// LZ4 compression (very fast, lower compression ratio).
    Lz4 = 3,

    /// LZ4 high-compression mode. Decodes with the plain LZ4 decoder.
    Lz4hc = 4,
}

impl CompressionType {
    /// Every scheme, in tag order.
    pub const ALL: [CompressionType; 5] = [
        CompressionType::None,
        CompressionType::Snappy,
        CompressionType::Zlib,
        CompressionType::Lz4,
        CompressionType::Lz4hc,
    ];

    /// Convert from the on-disk tag
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Snappy),
            2 => Some(CompressionType::Zlib),
            3 => Some(CompressionType::Lz4),
            4 => Some(CompressionType::Lz4hc),
            _ => None,
        }
    }

    /// The on-disk tag
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Lowercase name, as reported by [`crate::metadata`].
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Snappy => "snappy",
            CompressionType::Zlib => "zlib",
            CompressionType::Lz4 => "lz4",
            CompressionType::Lz4hc => "lz4hc",
        }
    }

    /// Whether the codec for this scheme was compiled in.
    pub fn is_supported(self) -> bool {
        match self {
            CompressionType::None => true,
            CompressionType::Snappy => cfg!(feature = "snappy"),
            CompressionType::Zlib => cfg!(feature = "zlib"),
            CompressionType::Lz4 | CompressionType::Lz4hc => cfg!(feature = "lz4-compression"),
        }
    }
}

impl TryFrom<u8> for CompressionType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_u8(value)
            .ok_or_else(|| Error::invalid_argument(format!("Invalid compression type: {}", value)))
    }
}

impl FromStr for CompressionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CompressionType::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_argument(format!("Invalid compression type: {}", s)))
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for creating a [`crate::Writer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Compression algorithm for data blocks.
    /// Default: CompressionType::None
    pub compression: CompressionType,

    /// Target size of an encoded data block (in bytes). A block is flushed
    /// once the next entry would push it past this size.
    /// Default: 8KB
    pub block_size: usize,

    /// Number of entries between restart points within a block.
    /// Default: 16
    pub block_restart_interval: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression: CompressionType::None,
            block_size: DEFAULT_BLOCK_SIZE,
            block_restart_interval: DEFAULT_RESTART_INTERVAL,
        }
    }
}

impl WriterOptions {
    /// Creates a new WriterOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression algorithm.
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the data block size.
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the restart interval.
    pub fn block_restart_interval(mut self, interval: usize) -> Self {
        self.block_restart_interval = interval;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::invalid_argument("block_size must be > 0"));
        }
        if self.block_size > u32::MAX as usize {
            return Err(Error::invalid_argument("block_size must fit in 32 bits"));
        }
        if self.block_restart_interval == 0 {
            return Err(Error::invalid_argument("block_restart_interval must be > 0"));
        }
        if !self.compression.is_supported() {
            return Err(Error::invalid_argument(format!(
                "compression {} is not enabled in this build",
                self.compression
            )));
        }
        Ok(())
    }
}

/// Options for creating a [`crate::Sorter`].
#[derive(Debug, Default)]
pub struct SorterOptions {
    /// How values of equal keys are combined.
    /// Default: MergePolicy::LastWriteWins
    pub merge_policy: MergePolicy,

    /// Directory in which spill files are created.
    /// Default: the system temporary directory
    pub temp_dir: Option<PathBuf>,

    /// Memory budget (in bytes) for buffered entries before a run is spilled.
    /// Default: 1GB
    pub max_memory: Option<usize>,
}

impl SorterOptions {
    /// Creates a new SorterOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the merge policy.
    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Sets the spill directory.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Sets the memory budget.
    pub fn max_memory(mut self, bytes: usize) -> Self {
        self.max_memory = Some(bytes);
        self
    }

    /// The effective memory budget.
    pub fn effective_max_memory(&self) -> usize {
        self.max_memory.unwrap_or(DEFAULT_SORTER_MAX_MEMORY)
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.effective_max_memory() == 0 {
            return Err(Error::invalid_argument("max_memory must be > 0"));
        }
        if let Some(dir) = &self.temp_dir {
            let meta = std::fs::metadata(dir).map_err(|_| {
                Error::invalid_argument(format!("Temporary directory does not exist: {:?}", dir))
            })?;
            if !meta.is_dir() {
                return Err(Error::invalid_argument(format!("Path {:?} is not a directory", dir)));
            }
        }
        Ok(())
    }
}
