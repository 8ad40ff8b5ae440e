//! Table statistics read from the footer and index block alone.

use crate::error::{Error, Result};
use crate::table::reader::{open_table_file, read_footer, read_index};
use serde::Serialize;
use std::path::Path;

/// Summary of a table file. No data block is decoded to produce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    /// Path the metadata was read from
    pub filename: String,
    /// Size of the file on disk
    pub filesize: u64,
    /// Offset of the index block
    pub index_block_offset: u64,
    /// Framed length of the index block
    pub index_bytes: u64,
    /// Total framed length of all data blocks
    pub data_block_bytes: u64,
    /// Target data block size the table was written with
    pub data_block_size: u64,
    /// Number of data blocks
    pub data_block_count: u64,
    /// Number of entries
    pub entry_count: u64,
    /// Sum of key lengths
    pub key_bytes: u64,
    /// Sum of value lengths
    pub value_bytes: u64,
    /// Name of the data block compression, e.g. `"zlib"`
    pub compression: String,
}

impl Metadata {
    /// Index block size as a percentage of the file size.
    pub fn index_bytes_pct(&self) -> f64 {
        percent(self.index_bytes, self.filesize)
    }

    /// Data block bytes as a percentage of the file size.
    pub fn data_block_bytes_pct(&self) -> f64 {
        percent(self.data_block_bytes, self.filesize)
    }

    /// File size as a percentage of the raw key and value bytes it stores.
    /// Zero for a table without key or value bytes.
    pub fn compactness(&self) -> f64 {
        percent(self.filesize, self.key_bytes + self.value_bytes)
    }

    /// Render as a JSON object.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// Read the [`Metadata`] of the table at `path`.
///
/// Fails with [`Error::InvalidArgument`] for an empty path, [`Error::NotFound`]
/// if the file cannot be opened, and a format error if the footer or index is
/// invalid.
pub fn metadata<P: AsRef<Path>>(path: P) -> Result<Metadata> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_argument("File name must not be empty"));
    }

    let mut file = open_table_file(path)?;
    let filesize = file.metadata()?.len();
    let footer = read_footer(&mut file, filesize)?;
    read_index(&mut file, &footer)?;

    Ok(Metadata {
        filename: path.display().to_string(),
        filesize,
        index_block_offset: footer.index_handle.offset,
        index_bytes: footer.index_handle.size,
        data_block_bytes: footer.bytes_data_blocks(),
        data_block_size: footer.data_block_size as u64,
        data_block_count: footer.count_data_blocks,
        entry_count: footer.count_entries,
        key_bytes: footer.bytes_keys,
        value_bytes: footer.bytes_values,
        compression: footer.compression.name().to_string(),
    })
}
