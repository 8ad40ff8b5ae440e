//! Block compression codecs.
//!
//! Each scheme is gated behind a cargo feature; asking for a codec that was
//! compiled out yields [`Error::Unsupported`].

use crate::config::CompressionType;
use crate::error::{Error, Result};

/// Compress `data` with the given scheme.
pub fn compress(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| Error::Io(std::io::Error::other(format!("Compression failed: {}", e)))),
        #[cfg(feature = "zlib")]
        CompressionType::Zlib => {
            use std::io::Write;
            let mut encoder = flate2::write::ZlibEncoder::new(
                Vec::with_capacity(data.len() / 2),
                flate2::Compression::default(),
            );
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        #[cfg(feature = "lz4-compression")]
        CompressionType::Lz4 => Ok(lz4::block::compress(data, None, true)?),
        #[cfg(feature = "lz4-compression")]
        CompressionType::Lz4hc => Ok(lz4::block::compress(
            data,
            Some(lz4::block::CompressionMode::HIGHCOMPRESSION(9)),
            true,
        )?),
        #[allow(unreachable_patterns)]
        other => Err(unsupported(other)),
    }
}

/// Decompress a payload written by [`compress`].
///
/// Malformed payloads are reported as format errors.
pub fn decompress(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| Error::format(format!("Snappy decompression failed: {}", e))),
        #[cfg(feature = "zlib")]
        CompressionType::Zlib => {
            use std::io::Read;
            let mut out = Vec::with_capacity(data.len() * 2);
            flate2::read::ZlibDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| Error::format(format!("Zlib decompression failed: {}", e)))?;
            Ok(out)
        }
        #[cfg(feature = "lz4-compression")]
        CompressionType::Lz4 | CompressionType::Lz4hc => lz4::block::decompress(data, None)
            .map_err(|e| Error::format(format!("LZ4 decompression failed: {}", e))),
        #[allow(unreachable_patterns)]
        other => Err(unsupported(other)),
    }
}

#[allow(dead_code)]
fn unsupported(compression: CompressionType) -> Error {
    Error::Unsupported(format!("{} compression not enabled", compression))
}
