//! Table footer implementation.
//!
//! The footer is a fixed-size (64 bytes) structure at the end of a table
//! file. It locates the index block and carries the aggregate statistics
//! reported by [`crate::metadata`].

use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::table::coding::{get_varint64, put_varint64};
use crate::table::{FOOTER_SIZE, FORMAT_VERSION, MAGIC_NUMBER};
use std::io::{Read, Write};

/// BlockHandle represents a pointer to a framed block in the table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHandle {
    /// Offset of the block in the file
    pub offset: u64,
    /// Size of the framed block in bytes
    pub size: u64,
}

impl BlockHandle {
    /// Create a new BlockHandle
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Append the handle as two varints (offset, size)
    pub fn encode_to(&self, buf: &mut Vec<u8>) {
        put_varint64(buf, self.offset);
        put_varint64(buf, self.size);
    }

    /// Decode a BlockHandle from its varint encoding
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (offset, n) =
            get_varint64(data).ok_or_else(|| Error::format("BlockHandle offset truncated"))?;
        let (size, m) =
            get_varint64(&data[n..]).ok_or_else(|| Error::format("BlockHandle size truncated"))?;
        if n + m != data.len() {
            return Err(Error::format("Trailing bytes after BlockHandle"));
        }
        Ok(Self { offset, size })
    }

    /// Get the end offset of this block
    pub fn end_offset(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// Footer is the last 64 bytes of a table file.
///
/// Format (little-endian):
/// ```text
/// [index_offset: u64]
/// [index_size: u64]
/// [count_entries: u64]
/// [count_data_blocks: u64]
/// [bytes_keys: u64]
/// [bytes_values: u64]
/// [data_block_size: u32]
/// [compression: u8]
/// [reserved: 3 bytes]
/// [version: u32]
/// [magic: u32]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    /// Handle to the index block
    pub index_handle: BlockHandle,
    /// Number of entries in the table
    pub count_entries: u64,
    /// Number of data blocks
    pub count_data_blocks: u64,
    /// Sum of all key lengths
    pub bytes_keys: u64,
    /// Sum of all value lengths
    pub bytes_values: u64,
    /// Data block size the writer was configured with
    pub data_block_size: u32,
    /// Compression applied to data blocks
    pub compression: CompressionType,
}

impl Footer {
    /// Encode the footer to bytes
    pub fn encode(&self) -> [u8; FOOTER_SIZE] {
        let mut buf = [0u8; FOOTER_SIZE];

        buf[0..8].copy_from_slice(&self.index_handle.offset.to_le_bytes());
        buf[8..16].copy_from_slice(&self.index_handle.size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.count_entries.to_le_bytes());
        buf[24..32].copy_from_slice(&self.count_data_blocks.to_le_bytes());
        buf[32..40].copy_from_slice(&self.bytes_keys.to_le_bytes());
        buf[40..48].copy_from_slice(&self.bytes_values.to_le_bytes());
        buf[48..52].copy_from_slice(&self.data_block_size.to_le_bytes());
        buf[52] = self.compression.tag();
        // 53..56 reserved
        buf[56..60].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf[60..64].copy_from_slice(&MAGIC_NUMBER.to_le_bytes());

        buf
    }

    /// Decode a footer from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != FOOTER_SIZE {
            return Err(Error::format(format!(
                "Footer size mismatch: expected {}, got {}",
                FOOTER_SIZE,
                data.len()
            )));
        }

        let magic = u32_at(data, 60);
        if magic != MAGIC_NUMBER {
            return Err(Error::format(format!(
                "Invalid table magic number: expected {:#x}, got {:#x}",
                MAGIC_NUMBER, magic
            )));
        }

        let version = u32_at(data, 56);
        if version != FORMAT_VERSION {
            return Err(Error::format(format!("Unsupported table format version {}", version)));
        }

        let compression = CompressionType::from_u8(data[52])
            .ok_or_else(|| Error::format(format!("Invalid compression type: {}", data[52])))?;

        Ok(Self {
            index_handle: BlockHandle::new(u64_at(data, 0), u64_at(data, 8)),
            count_entries: u64_at(data, 16),
            count_data_blocks: u64_at(data, 24),
            bytes_keys: u64_at(data, 32),
            bytes_values: u64_at(data, 40),
            data_block_size: u32_at(data, 48),
            compression,
        })
    }

    /// Write the footer to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }

    /// Read the footer from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; FOOTER_SIZE];
        reader.read_exact(&mut buf)?;
        Self::decode(&buf)
    }

    /// Total bytes occupied by data blocks (they start at offset 0).
    pub fn bytes_data_blocks(&self) -> u64 {
        self.index_handle.offset
    }
}

fn u64_at(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_footer() -> Footer {
        Footer {
            index_handle: BlockHandle::new(2332, 22),
            count_entries: 676,
            count_data_blocks: 1,
            bytes_keys: 1352,
            bytes_values: 1920,
            data_block_size: 8192,
            compression: CompressionType::Zlib,
        }
    }

    #[test]
    fn test_block_handle_encode_decode() {
        let handle = BlockHandle::new(1234, 5678);
        let mut encoded = Vec::new();
        handle.encode_to(&mut encoded);
        assert_eq!(encoded.len(), 4);

        let decoded = BlockHandle::decode(&encoded).unwrap();
        assert_eq!(decoded, handle);
    }

    #[test]
    fn test_block_handle_trailing_bytes() {
        let mut encoded = Vec::new();
        BlockHandle::new(1, 2).encode_to(&mut encoded);
        encoded.push(0);
        assert!(BlockHandle::decode(&encoded).is_err());
    }

    #[test]
    fn test_block_handle_end_offset() {
        let handle = BlockHandle::new(100, 50);
        assert_eq!(handle.end_offset(), 150);
    }

    #[test]
    fn test_footer_layout() {
        let encoded = sample_footer().encode();
        assert_eq!(encoded.len(), FOOTER_SIZE);
        assert_eq!(&encoded[0..8], &2332u64.to_le_bytes());
        assert_eq!(&encoded[8..16], &22u64.to_le_bytes());
        assert_eq!(&encoded[48..52], &8192u32.to_le_bytes());
        assert_eq!(encoded[52], CompressionType::Zlib.tag());
        assert_eq!(&encoded[53..56], &[0, 0, 0]);
        assert_eq!(&encoded[60..64], &MAGIC_NUMBER.to_le_bytes());
    }

    #[test]
    fn test_footer_invalid_magic() {
        let mut data = sample_footer().encode();
        data[60..64].copy_from_slice(&0xdeadbeefu32.to_le_bytes());

        let result = Footer::decode(&data);
        assert!(matches!(result.unwrap_err(), Error::Format(_)));
    }

    #[test]
    fn test_footer_invalid_version() {
        let mut data = sample_footer().encode();
        data[56..60].copy_from_slice(&99u32.to_le_bytes());
        assert!(Footer::decode(&data).unwrap_err().is_format());
    }

    #[test]
    fn test_footer_invalid_compression() {
        let mut data = sample_footer().encode();
        data[52] = 200;
        assert!(Footer::decode(&data).unwrap_err().is_format());
    }

    #[test]
    fn test_footer_write_read() {
        let footer = sample_footer();

        let mut buffer = Vec::new();
        footer.write_to(&mut buffer).unwrap();

        let mut cursor = Cursor::new(buffer);
        let read_footer = Footer::read_from(&mut cursor).unwrap();

        assert_eq!(read_footer, footer);
        assert_eq!(read_footer.bytes_data_blocks(), 2332);
    }
}
