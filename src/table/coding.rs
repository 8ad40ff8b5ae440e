//! Varint helpers shared by the block and index encodings.

use bytes::BufMut;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT64_LEN: usize = 10;

/// Append `value` as a LEB128 varint.
pub fn put_varint64<B: BufMut>(buf: &mut B, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Decode a varint from the front of `data`.
///
/// Returns the value and the number of bytes consumed, or `None` if the
/// input is truncated or overflows 64 bits.
pub fn get_varint64(data: &[u8]) -> Option<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate().take(MAX_VARINT64_LEN) {
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }
        shift += 7;
    }

    None
}

/// Number of bytes `value` occupies as a varint.
pub fn varint_length(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_encoding() {
        for value in [0u64, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            put_varint64(&mut buf, value);
            assert_eq!(buf.len(), varint_length(value));

            let (decoded, used) = get_varint64(&buf).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(used, buf.len());
        }
    }

    #[test]
    fn test_varint_truncated() {
        let mut buf = Vec::new();
        put_varint64(&mut buf, 1 << 40);
        buf.pop();
        assert!(get_varint64(&buf).is_none());
        assert!(get_varint64(&[]).is_none());
    }

    #[test]
    fn test_varint_overlong() {
        assert!(get_varint64(&[0xFF; 11]).is_none());
    }
}
