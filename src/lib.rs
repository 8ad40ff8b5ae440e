//! # mtbl - Immutable Sorted String Tables
//!
//! mtbl writes and reads immutable files of sorted key-value pairs and
//! provides an external sorter that turns unordered input into such a file.
//!
//! ## Architecture
//!
//! - **Table**: data blocks with prefix-compressed keys and restart points,
//!   an index block, and a fixed-size footer
//! - **Writer**: builds a table from strictly increasing keys
//! - **Reader**: point, prefix and range lookups with lazy iterators
//! - **Sorter**: buffers unordered pairs, spills sorted runs to disk and
//!   merges them, combining duplicate keys with a [`MergePolicy`]
//! - **Metadata**: statistics read from the footer and index alone
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use mtbl::{CompressionType, Reader, Sorter, SorterOptions, Writer, WriterOptions};
//!
//! # fn main() -> Result<(), mtbl::Error> {
//! let mut sorter = Sorter::new(SorterOptions::default())?;
//! sorter.add(b"1010", b"test3")?;
//! sorter.add(b"1000", b"test1")?;
//!
//! let options = WriterOptions::default().compression(CompressionType::Zlib);
//! let mut writer = Writer::create("sorted.mtbl", options)?;
//! sorter.write(&mut writer)?;
//! writer.close()?;
//!
//! let reader = Reader::open("sorted.mtbl")?;
//! for entry in reader.get_prefix(b"10") {
//!     let (key, value) = entry?;
//!     println!("{:?} => {:?}", key, value);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod config;
pub mod error;
pub mod metadata;
pub mod sorter;
pub mod table;

// Re-exports
pub use config::{CompressionType, SorterOptions, WriterOptions};
pub use error::{Error, Result};
pub use metadata::{metadata, Metadata};
pub use sorter::{MergeIterator, MergePolicy, Sorter};
pub use table::{Reader, TableIterator, Writer};

use std::path::Path;

/// A key-value pair.
pub type Entry = (Vec<u8>, Vec<u8>);

/// Open the table at `path` for reading.
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Reader> {
    Reader::open(path)
}

/// Create a new table at `path`; the path must not exist yet.
pub fn create_writer<P: AsRef<Path>>(path: P, options: WriterOptions) -> Result<Writer> {
    Writer::create(path, options)
}

/// Create an external sorter.
pub fn create_sorter(options: SorterOptions) -> Result<Sorter> {
    Sorter::new(options)
}
