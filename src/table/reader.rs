//! Table reader implementation.
//!
//! A [`Reader`] loads the footer and the whole index when it is opened and
//! decodes data blocks on demand. Every lookup returns a [`TableIterator`]
//! that holds at most one decoded block at a time.

use crate::error::{Error, Result};
use crate::table::block::{decode_framed, Block, BlockIterator, BLOCK_FRAME_OVERHEAD};
use crate::table::footer::{BlockHandle, Footer};
use crate::table::index::IndexBlock;
use crate::table::FOOTER_SIZE;
use crate::Entry;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reader provides read access to a table file.
///
/// Usage:
/// ```no_run
/// use mtbl::Reader;
///
/// let reader = Reader::open("table.mtbl").unwrap();
/// for entry in reader.get_prefix(b"user:") {
///     let (key, value) = entry.unwrap();
///     println!("{:?} => {:?}", key, value);
/// }
/// ```
///
/// File access is serialized through an internal mutex, so a reader can be
/// shared between threads. Independent readers on the same file never
/// interact.
#[derive(Debug)]
pub struct Reader {
    path: PathBuf,
    file: Arc<Mutex<File>>,
    index: Arc<IndexBlock>,
    footer: Footer,
    file_size: u64,
}

impl Reader {
    /// Open a table file for reading.
    ///
    /// Fails with [`Error::NotFound`] if the file is missing or unreadable and
    /// with a format error if the footer or index is invalid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = open_table_file(path)?;
        let file_size = file.metadata()?.len();

        let footer = read_footer(&mut file, file_size)?;
        let index = read_index(&mut file, &footer)?;

        log::info!(
            "Opened table {:?}: {} entries in {} data blocks",
            path,
            footer.count_entries,
            index.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(file)),
            index: Arc::new(index),
            footer,
            file_size,
        })
    }

    /// Iterate over every entry in ascending key order.
    ///
    /// Each call starts again from the first entry.
    pub fn iter(&self) -> TableIterator {
        TableIterator::new(self, None, Bound::Unbounded)
    }

    /// Iterate from the first key `>= key` to the end of the table.
    pub fn seek(&self, key: &[u8]) -> TableIterator {
        TableIterator::new(self, Some(key), Bound::Unbounded)
    }

    /// Exact lookup: yields the matching entry, or nothing if `key` is absent.
    pub fn get(&self, key: &[u8]) -> TableIterator {
        TableIterator::new(self, Some(key), Bound::Exact(key.to_vec()))
    }

    /// Exact lookup returning only the value.
    pub fn get_value(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get(key).next().transpose().map(|entry| entry.map(|(_, value)| value))
    }

    /// Yields every entry whose key starts with `prefix`, in ascending order.
    ///
    /// Iteration stops at the first key past the prefix without scanning
    /// the rest of the table.
    pub fn get_prefix(&self, prefix: &[u8]) -> TableIterator {
        TableIterator::new(self, Some(prefix), Bound::Prefix(prefix.to_vec()))
    }

    /// Yields every entry with `low <= key <= high`, in ascending order.
    ///
    /// Both bounds are inclusive. If `low > high` nothing is yielded.
    pub fn get_range(&self, low: &[u8], high: &[u8]) -> TableIterator {
        TableIterator::new(self, Some(low), Bound::Inclusive(high.to_vec()))
    }

    /// The decoded footer
    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    /// Get the number of data blocks
    pub fn num_blocks(&self) -> usize {
        self.index.len()
    }

    /// Get the file size
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path the reader was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Open a table file, mapping missing or unreadable files to [`Error::NotFound`].
pub(crate) fn open_table_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            Error::not_found(format!("Unable to open file {:?}: {}", path, e))
        }
        _ => Error::Io(e),
    })
}

/// Read and validate the footer at the end of `file`.
pub(crate) fn read_footer(file: &mut File, file_size: u64) -> Result<Footer> {
    if file_size < FOOTER_SIZE as u64 {
        return Err(Error::format("File too small to be a valid table"));
    }

    file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
    let footer = Footer::read_from(file)?;

    let index = &footer.index_handle;
    if index.size < BLOCK_FRAME_OVERHEAD as u64
        || index.end_offset() != file_size - FOOTER_SIZE as u64
    {
        return Err(Error::format(format!(
            "Index block handle {}+{} does not fit file of {} bytes",
            index.offset, index.size, file_size
        )));
    }

    Ok(footer)
}

/// Read the index block located by `footer` and check it against the footer.
pub(crate) fn read_index(file: &mut File, footer: &Footer) -> Result<IndexBlock> {
    let data = read_framed(file, &footer.index_handle)?;
    let index = IndexBlock::decode(data)?;

    if index.len() as u64 != footer.count_data_blocks {
        return Err(Error::format(format!(
            "Index has {} entries but footer records {} data blocks",
            index.len(),
            footer.count_data_blocks
        )));
    }
    if index.entries().iter().any(|e| e.handle.end_offset() > footer.index_handle.offset) {
        return Err(Error::format("Data block handle points past the index block"));
    }

    Ok(index)
}

fn read_framed(file: &mut File, handle: &BlockHandle) -> Result<bytes::Bytes> {
    if handle.size < BLOCK_FRAME_OVERHEAD as u64 {
        return Err(Error::format("Block size too small"));
    }

    let mut buffer = vec![0u8; handle.size as usize];
    file.seek(SeekFrom::Start(handle.offset))?;
    file.read_exact(&mut buffer)?;

    decode_framed(&buffer)
}

fn read_data_block(file: &Mutex<File>, handle: &BlockHandle) -> Result<Block> {
    let data = {
        let mut file = file.lock();
        read_framed(&mut file, handle)?
    };
    Block::new(data)
}

/// Where a [`TableIterator`] stops.
#[derive(Debug, Clone)]
enum Bound {
    Unbounded,
    Exact(Vec<u8>),
    Prefix(Vec<u8>),
    Inclusive(Vec<u8>),
}

impl Bound {
    fn admits(&self, key: &[u8]) -> bool {
        match self {
            Bound::Unbounded => true,
            Bound::Exact(k) => key == k.as_slice(),
            Bound::Prefix(p) => key.starts_with(p),
            Bound::Inclusive(high) => key <= high.as_slice(),
        }
    }
}

/// Lazy, ascending iterator over a range of table entries.
///
/// Blocks are read and decoded one at a time; the previous block is
/// released before the next one is loaded. After yielding an error the
/// iterator is exhausted.
#[derive(Debug)]
pub struct TableIterator {
    file: Arc<Mutex<File>>,
    index: Arc<IndexBlock>,
    next_block: usize,
    block_iter: Option<BlockIterator>,
    /// Seek target applied to the first block loaded.
    seek_key: Option<Vec<u8>>,
    /// The block cursor sits on an entry that has not been yielded yet.
    pending: bool,
    bound: Bound,
    done: bool,
}

impl TableIterator {
    fn new(reader: &Reader, start: Option<&[u8]>, bound: Bound) -> Self {
        let next_block = match start {
            Some(key) => reader.index.find_block(key).unwrap_or(reader.index.len()),
            None => 0,
        };

        Self {
            file: Arc::clone(&reader.file),
            index: Arc::clone(&reader.index),
            next_block,
            block_iter: None,
            seek_key: start.map(<[u8]>::to_vec),
            pending: false,
            bound,
            done: false,
        }
    }

    /// Move the cursor to the next entry, loading blocks as needed.
    fn advance(&mut self) -> Result<bool> {
        loop {
            if let Some(iter) = self.block_iter.as_mut() {
                if std::mem::take(&mut self.pending) || iter.advance()? {
                    return Ok(true);
                }
                self.block_iter = None;
            }

            let Some(entry) = self.index.get(self.next_block) else {
                return Ok(false);
            };
            let handle = entry.handle;
            self.next_block += 1;

            let block = read_data_block(&self.file, &handle)?;
            let mut iter = block.iter();
            match self.seek_key.take() {
                Some(key) => self.pending = iter.seek(&key)?,
                None => iter.seek_to_first(),
            }
            self.block_iter = Some(iter);
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.block_iter = None;
    }
}

impl Iterator for TableIterator {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.advance() {
            Ok(true) => {}
            Ok(false) => {
                self.finish();
                return None;
            }
            Err(e) => {
                self.finish();
                return Some(Err(e));
            }
        }

        let iter = self.block_iter.as_ref()?;
        if !self.bound.admits(iter.key()) {
            self.finish();
            return None;
        }

        let entry = (iter.key().to_vec(), iter.value().to_vec());
        if matches!(self.bound, Bound::Exact(_)) {
            self.finish();
        }
        Some(Ok(entry))
    }
}

impl std::iter::FusedIterator for TableIterator {}
