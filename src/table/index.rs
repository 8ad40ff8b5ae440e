//! Index block implementation.
//!
//! The index block maps the last key of every data block to that block's
//! handle. Readers decode it once and keep it in memory.

use crate::error::{Error, Result};
use crate::table::block::{Block, BlockBuilder};
use crate::table::footer::BlockHandle;
use bytes::Bytes;

/// IndexEntry represents a single entry in the index block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// The largest key in the data block
    pub last_key: Vec<u8>,
    /// Handle to the data block
    pub handle: BlockHandle,
}

impl IndexEntry {
    /// Create a new IndexEntry
    pub fn new(last_key: Vec<u8>, handle: BlockHandle) -> Self {
        Self { last_key, handle }
    }
}

/// Decoded index: one entry per data block, in key order.
#[derive(Debug, Default)]
pub struct IndexBlock {
    entries: Vec<IndexEntry>,
}

impl IndexBlock {
    /// Decode an index from raw (unframed) block data.
    pub fn decode(data: Bytes) -> Result<Self> {
        let block = Block::new(data)?;
        let mut iter = block.iter();
        iter.seek_to_first();

        let mut entries: Vec<IndexEntry> = Vec::new();
        while iter.advance()? {
            if let Some(prev) = entries.last() {
                if iter.key() <= prev.last_key.as_slice() {
                    return Err(Error::format("Index keys are not strictly increasing"));
                }
            }
            let handle = BlockHandle::decode(iter.value())?;
            entries.push(IndexEntry::new(iter.key().to_vec(), handle));
        }

        Ok(Self { entries })
    }

    /// Index of the first data block whose last key is `>= key`.
    ///
    /// Returns `None` when `key` is greater than every key in the table.
    pub fn find_block(&self, key: &[u8]) -> Option<usize> {
        let idx = self.entries.partition_point(|e| e.last_key.as_slice() < key);
        (idx < self.entries.len()).then_some(idx)
    }

    /// Get the entry at `idx`
    pub fn get(&self, idx: usize) -> Option<&IndexEntry> {
        self.entries.get(idx)
    }

    /// All entries in key order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Get the number of data blocks in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// IndexBlockBuilder builds an index block.
#[derive(Debug)]
pub struct IndexBlockBuilder {
    builder: BlockBuilder,
}

impl IndexBlockBuilder {
    /// Create a new IndexBlockBuilder
    pub fn new() -> Self {
        // Every index entry is a restart point so lookups never decode deltas
        Self { builder: BlockBuilder::new(1) }
    }

    /// Add an index entry
    pub fn add_entry(&mut self, entry: &IndexEntry) {
        let mut value = Vec::with_capacity(20);
        entry.handle.encode_to(&mut value);
        self.builder.add(&entry.last_key, &value);
    }

    /// Finish building and return the block data
    pub fn finish(self) -> Bytes {
        self.builder.finish()
    }

    /// Number of entries added
    pub fn len(&self) -> usize {
        self.builder.len()
    }

    /// Check if the builder is empty
    pub fn is_empty(&self) -> bool {
        self.builder.is_empty()
    }
}

impl Default for IndexBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
