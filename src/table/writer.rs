//! Table writer implementation.
//!
//! Builds a table file from a sequence of strictly increasing keys.

use crate::config::{CompressionType, WriterOptions};
use crate::error::{Error, Result};
use crate::table::block::{encode_framed, BlockBuilder};
use crate::table::footer::{BlockHandle, Footer};
use crate::table::index::{IndexBlockBuilder, IndexEntry};
use crate::table::FOOTER_SIZE;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writer builds a table file.
///
/// Usage:
/// ```no_run
/// use mtbl::{Writer, WriterOptions};
///
/// let mut writer = Writer::create("table.mtbl", WriterOptions::default()).unwrap();
/// writer.add(b"key1", b"value1").unwrap();
/// writer.add(b"key2", b"value2").unwrap();
/// writer.close().unwrap();
/// ```
///
/// A writer that is dropped without being closed is finalized on drop;
/// errors at that point can only be logged, so call [`close`](Self::close).
#[derive(Debug)]
pub struct Writer {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    options: WriterOptions,
    data_block_builder: BlockBuilder,
    index_block_builder: IndexBlockBuilder,
    last_key: Vec<u8>,
    offset: u64,
    count_entries: u64,
    count_data_blocks: u64,
    bytes_keys: u64,
    bytes_values: u64,
}

impl Writer {
    /// Create a new table at `path`.
    ///
    /// Fails with [`Error::InvalidArgument`] if the path is empty, already
    /// exists, or the options are invalid.
    pub fn create<P: AsRef<Path>>(path: P, options: WriterOptions) -> Result<Self> {
        let path = path.as_ref();
        options.validate()?;

        if path.as_os_str().is_empty() {
            return Err(Error::invalid_argument("File name must not be empty"));
        }
        if path.exists() {
            return Err(Error::invalid_argument(format!("File already exists: {:?}", path)));
        }

        let file = OpenOptions::new().write(true).create_new(true).open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                Error::invalid_argument(format!("File already exists: {:?}", path))
            } else {
                Error::Io(e)
            }
        })?;

        log::debug!(
            "Creating table {:?} (compression={}, block_size={})",
            path,
            options.compression,
            options.block_size
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
            data_block_builder: BlockBuilder::new(options.block_restart_interval),
            index_block_builder: IndexBlockBuilder::new(),
            options,
            last_key: Vec::new(),
            offset: 0,
            count_entries: 0,
            count_data_blocks: 0,
            bytes_keys: 0,
            bytes_values: 0,
        })
    }

    /// Add a key-value pair to the table.
    ///
    /// `key` must be strictly greater than the previously added key, otherwise
    /// [`Error::OutOfOrderKey`] is returned and the table is left unchanged.
    pub fn add(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let (key, value) = (key.as_ref(), value.as_ref());

        if self.writer.is_none() {
            return Err(Error::already_closed(format!(
                "Failed to write key {}: writer closed",
                key.escape_ascii()
            )));
        }

        if self.count_entries > 0 && key <= self.last_key.as_slice() {
            return Err(Error::OutOfOrderKey(format!(
                "Failed to write key {}, input must be presorted (previous key {})",
                key.escape_ascii(),
                self.last_key.escape_ascii()
            )));
        }

        // Flush first if this entry would overflow the current block
        if !self.data_block_builder.is_empty()
            && self.data_block_builder.estimated_size_after(key, value) > self.options.block_size
        {
            self.flush_data_block()?;
        }

        self.data_block_builder.add(key, value);
        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.count_entries += 1;
        self.bytes_keys += key.len() as u64;
        self.bytes_values += value.len() as u64;

        Ok(())
    }

    fn file(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or_else(|| Error::already_closed("Writer is already closed"))
    }

    /// Flush the current data block to disk
    fn flush_data_block(&mut self) -> Result<()> {
        if self.data_block_builder.is_empty() {
            return Ok(());
        }

        let old_builder = std::mem::replace(
            &mut self.data_block_builder,
            BlockBuilder::new(self.options.block_restart_interval),
        );
        let framed = encode_framed(self.options.compression, &old_builder.finish())?;
        self.file()?.write_all(&framed)?;

        let handle = BlockHandle::new(self.offset, framed.len() as u64);
        self.offset += framed.len() as u64;
        self.count_data_blocks += 1;
        self.index_block_builder.add_entry(&IndexEntry::new(self.last_key.clone(), handle));

        log::debug!(
            "Flushed data block {} of {:?}: offset={}, size={}",
            self.count_data_blocks,
            self.path,
            handle.offset,
            handle.size
        );

        Ok(())
    }

    /// Finish the table: flush the last data block, write the index and the
    /// footer, and sync the file. Returns the final file size.
    ///
    /// Calling `close` a second time fails with [`Error::AlreadyClosed`].
    pub fn close(&mut self) -> Result<u64> {
        if self.writer.is_none() {
            return Err(Error::already_closed("Writer is already closed"));
        }

        // The file handle is released whether or not finishing succeeded
        let result = self.write_trailer();
        self.writer = None;
        result
    }

    fn write_trailer(&mut self) -> Result<u64> {
        self.flush_data_block()?;

        let index_builder = std::mem::take(&mut self.index_block_builder);
        let index_framed = encode_framed(CompressionType::None, &index_builder.finish())?;
        let index_handle = BlockHandle::new(self.offset, index_framed.len() as u64);

        let footer = Footer {
            index_handle,
            count_entries: self.count_entries,
            count_data_blocks: self.count_data_blocks,
            bytes_keys: self.bytes_keys,
            bytes_values: self.bytes_values,
            data_block_size: self.options.block_size as u32,
            compression: self.options.compression,
        };

        let file = self.file()?;
        file.write_all(&index_framed)?;
        footer.write_to(file)?;
        file.flush()?;
        file.get_ref().sync_all()?;

        let total_size = index_handle.end_offset() + FOOTER_SIZE as u64;
        log::info!(
            "Closed table {:?}: {} entries in {} data blocks, {} bytes",
            self.path,
            self.count_entries,
            self.count_data_blocks,
            total_size
        );
        Ok(total_size)
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Get the number of entries added
    pub fn num_entries(&self) -> u64 {
        self.count_entries
    }

    /// Path of the table being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Options the writer was created with
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(e) = self.close() {
                log::warn!("Failed to finalize table {:?} on drop: {}", self.path, e);
            }
        }
    }
}
