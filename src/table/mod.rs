//! Table (sorted string table) implementation.
//!
//! A table is an immutable, sorted file of key-value pairs. It is written
//! once, front to back, by a [`Writer`] and read by any number of
//! [`Reader`]s.
//!
//! ## File Format
//!
//! ```text
//! [Data Block 1]
//! [Data Block 2]
//! ...
//! [Data Block N]
//! [Index Block]     // Last key + handle of every data block
//! [Footer: 64B]     // Index handle, statistics, version, magic
//! ```
//!
//! ## Block Framing
//!
//! Every block on disk is stored as:
//! - Compression tag (1 byte)
//! - Payload, compressed with the scheme named by the tag
//! - CRC32 of tag and payload (4 bytes)
//!
//! Data blocks use the compression chosen at write time; the index block is
//! never compressed.
//!
//! ## Index Format
//!
//! The index block contains entries that map keys to data blocks:
//! - Key: The largest key in the block
//! - Value: varint offset and varint size of the framed block

pub mod block;
pub mod coding;
pub mod compression;
pub mod footer;
pub mod index;
pub mod reader;
pub mod writer;

pub use block::{Block, BlockBuilder, BlockIterator};
pub use footer::{BlockHandle, Footer};
pub use index::{IndexBlock, IndexEntry};
pub use reader::{Reader, TableIterator};
pub use writer::Writer;

/// Footer size in bytes (fixed)
pub const FOOTER_SIZE: usize = 64;

/// Magic number for table files ("MTBL" in hex)
pub const MAGIC_NUMBER: u32 = 0x4D54_424C;

/// Version of the on-disk layout written by this crate
pub const FORMAT_VERSION: u32 = 1;
