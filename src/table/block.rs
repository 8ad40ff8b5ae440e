//! Block format implementation.
//!
//! A block contains multiple key-value entries and uses restart points
//! for efficient binary search and prefix compression.

use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::table::coding::{get_varint64, put_varint64, varint_length};
use crate::table::compression;
use bytes::{BufMut, Bytes, BytesMut};

/// Bytes a framed block carries besides its payload: tag (1) + crc32 (4).
pub const BLOCK_FRAME_OVERHEAD: usize = 5;

/// Block stores key-value pairs with prefix compression.
///
/// Format:
/// ```text
/// [Entry 1]
/// [Entry 2]
/// ...
/// [Entry N]
/// [Restart Point 1: u32]
/// ...
/// [Restart Point M: u32]
/// [Num Restarts: u32]
/// ```
///
/// Each entry format:
/// ```text
/// [shared_key_len: varint]     // Length of shared prefix with previous key
/// [unshared_key_len: varint]   // Length of unshared key suffix
/// [value_len: varint]          // Length of value
/// [unshared_key: bytes]        // Key suffix
/// [value: bytes]               // Value data
/// ```
///
/// Entries at restart points always have `shared_key_len == 0`.
#[derive(Debug, Clone)]
pub struct Block {
    data: Bytes,
    restart_offset: usize,
    num_restarts: usize,
}

impl Block {
    /// Create a new Block from raw (decompressed) data
    pub fn new(data: Bytes) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::format("Block too small"));
        }

        let num_restarts = read_u32_le(&data, data.len() - 4) as usize;
        if num_restarts == 0 {
            return Err(Error::format("Block has no restart points"));
        }

        // restart_offset = data_len - 4 (num_restarts) - 4 * num_restarts (restart points)
        let restart_offset = num_restarts
            .checked_mul(4)
            .and_then(|n| data.len().checked_sub(4 + n))
            .ok_or_else(|| Error::format("Invalid restart offset"))?;

        Ok(Self { data, restart_offset, num_restarts })
    }

    /// Get the number of restart points
    pub fn num_restarts(&self) -> usize {
        self.num_restarts
    }

    /// Get a restart point by index
    fn restart_point(&self, index: usize) -> Result<usize> {
        let point = read_u32_le(&self.data, self.restart_offset + index * 4) as usize;
        if point > self.restart_offset {
            return Err(Error::format("Restart point past end of entries"));
        }
        Ok(point)
    }

    /// Full key stored at a restart point.
    fn restart_key(&self, index: usize) -> Result<&[u8]> {
        let offset = self.restart_point(index)?;
        let header = decode_entry_header(&self.data[offset..self.restart_offset])?;
        if header.shared != 0 {
            return Err(Error::format("Restart entry has a shared prefix"));
        }
        let start = offset + header.len;
        Ok(&self.data[start..start + header.unshared])
    }

    /// Create an iterator over the block
    pub fn iter(&self) -> BlockIterator {
        BlockIterator::new(self.clone())
    }

    /// Get the raw data
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

#[derive(Debug)]
struct EntryHeader {
    shared: usize,
    unshared: usize,
    value_len: usize,
    /// Bytes taken by the three varints.
    len: usize,
}

/// Decode the varint header at the front of `data`, checking that the key
/// suffix and value fit in what follows.
fn decode_entry_header(data: &[u8]) -> Result<EntryHeader> {
    let truncated = || Error::format("Truncated block entry");

    let (shared, n1) = get_varint64(data).ok_or_else(truncated)?;
    let (unshared, n2) = get_varint64(&data[n1..]).ok_or_else(truncated)?;
    let (value_len, n3) = get_varint64(&data[n1 + n2..]).ok_or_else(truncated)?;
    let len = n1 + n2 + n3;

    let body = unshared.checked_add(value_len).ok_or_else(truncated)?;
    if ((data.len() - len) as u64) < body {
        return Err(truncated());
    }

    Ok(EntryHeader {
        shared: shared as usize,
        unshared: unshared as usize,
        value_len: value_len as usize,
        len,
    })
}

/// BlockBuilder builds a block with prefix compression.
#[derive(Debug)]
pub struct BlockBuilder {
    buffer: BytesMut,
    restarts: Vec<u32>,
    counter: usize,
    num_entries: usize,
    last_key: Vec<u8>,
    block_restart_interval: usize,
}

impl BlockBuilder {
    /// Create a new BlockBuilder
    pub fn new(block_restart_interval: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            restarts: vec![0], // First restart point at offset 0
            counter: 0,
            num_entries: 0,
            last_key: Vec::new(),
            block_restart_interval: block_restart_interval.max(1),
        }
    }

    /// Add a key-value pair to the block.
    ///
    /// Keys must be added in strictly increasing order; the table writer
    /// enforces this before calling in.
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        debug_assert!(
            self.num_entries == 0 || key > self.last_key.as_slice(),
            "Keys must be added in sorted order"
        );

        let mut shared = 0;

        // Add a restart point if needed
        if self.counter >= self.block_restart_interval {
            self.restarts.push(self.buffer.len() as u32);
            self.counter = 0;
        } else {
            shared = shared_prefix_len(&self.last_key, key);
        }

        let unshared = key.len() - shared;

        // Write entry: shared | unshared | value_len | key_suffix | value
        put_varint64(&mut self.buffer, shared as u64);
        put_varint64(&mut self.buffer, unshared as u64);
        put_varint64(&mut self.buffer, value.len() as u64);
        self.buffer.put_slice(&key[shared..]);
        self.buffer.put_slice(value);

        self.last_key.truncate(shared);
        self.last_key.extend_from_slice(&key[shared..]);
        self.counter += 1;
        self.num_entries += 1;
    }

    /// Finish building and return the block data
    pub fn finish(mut self) -> Bytes {
        for restart in &self.restarts {
            self.buffer.put_u32_le(*restart);
        }
        self.buffer.put_u32_le(self.restarts.len() as u32);

        self.buffer.freeze()
    }

    /// Get the current size of the block
    pub fn current_size(&self) -> usize {
        self.buffer.len() + self.restarts.len() * 4 + 4
    }

    /// Block size after adding this entry.
    pub fn estimated_size_after(&self, key: &[u8], value: &[u8]) -> usize {
        let restart = self.counter >= self.block_restart_interval;
        let shared = if restart { 0 } else { shared_prefix_len(&self.last_key, key) };
        let unshared = key.len() - shared;

        self.current_size()
            + if restart { 4 } else { 0 }
            + varint_length(shared as u64)
            + varint_length(unshared as u64)
            + varint_length(value.len() as u64)
            + unshared
            + value.len()
    }

    /// Check if the block is empty
    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    /// Number of entries added so far
    pub fn len(&self) -> usize {
        self.num_entries
    }
}

fn shared_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Cursor over entries in a block.
///
/// After [`seek_to_first`](Self::seek_to_first) the cursor sits before the
/// first entry; each successful [`advance`](Self::advance) or
/// [`seek`](Self::seek) leaves it on an entry whose key and value can be read.
#[derive(Debug)]
pub struct BlockIterator {
    block: Block,
    current: usize,
    key: Vec<u8>,
    value: (usize, usize),
    valid: bool,
}

impl BlockIterator {
    fn new(block: Block) -> Self {
        Self { block, current: 0, key: Vec::new(), value: (0, 0), valid: false }
    }

    /// Position before the first entry
    pub fn seek_to_first(&mut self) {
        self.current = 0;
        self.key.clear();
        self.valid = false;
    }

    fn seek_to_restart_point(&mut self, index: usize) -> Result<()> {
        self.current = self.block.restart_point(index)?;
        self.key.clear();
        self.valid = false;
        Ok(())
    }

    /// Move to the next entry. Returns false once the block is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        match self.parse_next_entry() {
            Ok(valid) => {
                self.valid = valid;
                Ok(valid)
            }
            Err(e) => {
                self.valid = false;
                self.current = self.block.restart_offset;
                Err(e)
            }
        }
    }

    fn parse_next_entry(&mut self) -> Result<bool> {
        if self.current >= self.block.restart_offset {
            return Ok(false);
        }

        let data = &self.block.data[self.current..self.block.restart_offset];
        let header = decode_entry_header(data)?;
        if header.shared > self.key.len() {
            return Err(Error::format("Shared prefix longer than previous key"));
        }

        let key_start = self.current + header.len;
        let value_start = key_start + header.unshared;
        let value_end = value_start + header.value_len;

        self.key.truncate(header.shared);
        self.key.extend_from_slice(&self.block.data[key_start..value_start]);
        self.value = (value_start, value_end);
        self.current = value_end;

        Ok(true)
    }

    /// Position at the first entry with key `>= target`.
    ///
    /// Binary-searches the restart keys for the last restart point whose key
    /// is below `target`, then scans forward. Returns false if every key in
    /// the block is smaller than `target`.
    pub fn seek(&mut self, target: &[u8]) -> Result<bool> {
        let mut left = 0;
        let mut right = self.block.num_restarts - 1;

        while left < right {
            let mid = (left + right + 1) / 2;
            if self.block.restart_key(mid)? < target {
                left = mid;
            } else {
                right = mid - 1;
            }
        }

        self.seek_to_restart_point(left)?;
        while self.advance()? {
            if self.key.as_slice() >= target {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Check if the iterator is positioned on an entry
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Get the current key
    pub fn key(&self) -> &[u8] {
        assert!(self.valid, "Iterator not valid");
        &self.key
    }

    /// Get the current value
    pub fn value(&self) -> &[u8] {
        assert!(self.valid, "Iterator not valid");
        &self.block.data[self.value.0..self.value.1]
    }
}

/// Compress an encoded block and wrap it as `[tag][payload][crc32]`.
pub fn encode_framed(compression: CompressionType, raw: &[u8]) -> Result<Vec<u8>> {
    let payload = compression::compress(compression, raw)?;

    let mut framed = Vec::with_capacity(payload.len() + BLOCK_FRAME_OVERHEAD);
    framed.push(compression.tag());
    framed.extend_from_slice(&payload);
    let checksum = crc32fast::hash(&framed);
    framed.extend_from_slice(&checksum.to_le_bytes());

    Ok(framed)
}

/// Verify and unwrap a framed block, returning the decompressed contents.
pub fn decode_framed(framed: &[u8]) -> Result<Bytes> {
    if framed.len() < BLOCK_FRAME_OVERHEAD {
        return Err(Error::format("Block size too small"));
    }

    let (body, checksum_bytes) = framed.split_at(framed.len() - 4);
    let stored_checksum = read_u32_le(checksum_bytes, 0);
    let computed_checksum = crc32fast::hash(body);
    if computed_checksum != stored_checksum {
        return Err(Error::ChecksumMismatch { expected: stored_checksum, actual: computed_checksum });
    }

    let compression = CompressionType::from_u8(body[0])
        .ok_or_else(|| Error::format(format!("Invalid compression type: {}", body[0])))?;
    let raw = compression::decompress(compression, &body[1..])?;

    Ok(Bytes::from(raw))
}
