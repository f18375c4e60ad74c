//! Codec backends
//!
//! Payloads are small (at most 10 MiB), so every codec works on whole
//! in-memory buffers. The zstd encoder uses a single frame without checksum;
//! paste integrity is covered by the AEAD layer when encryption is enabled.
//!
//! Decoders stop at [`MAX_DECODED_LEN`]; a stream that inflates past the
//! largest accepted paste is a decode error.

use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use npad_core::{NpadError, NpadResult, RetentionClass};

/// Largest payload any retention class accepts.
pub const MAX_DECODED_LEN: usize = RetentionClass::Short.max_bytes();

fn read_bounded(decoder: impl Read, codec: &str, hint: usize) -> NpadResult<Vec<u8>> {
    let mut out = Vec::with_capacity(hint.min(MAX_DECODED_LEN));
    decoder
        .take(MAX_DECODED_LEN as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| NpadError::Decode(format!("{codec}: {e}")))?;
    if out.len() > MAX_DECODED_LEN {
        return Err(NpadError::Decode(format!(
            "{codec}: output exceeds {MAX_DECODED_LEN} bytes"
        )));
    }
    Ok(out)
}

pub fn gzip_encode(data: &[u8], level: u32) -> NpadResult<Vec<u8>> {
    let mut enc = GzEncoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        Compression::new(level),
    );
    enc.write_all(data)?;
    Ok(enc.finish()?)
}

pub fn gzip_decode(data: &[u8]) -> NpadResult<Vec<u8>> {
    read_bounded(GzDecoder::new(data), "gzip", data.len() * 2)
}

pub fn zlib_encode(data: &[u8], level: u32) -> NpadResult<Vec<u8>> {
    let mut enc = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        Compression::new(level),
    );
    enc.write_all(data)?;
    Ok(enc.finish()?)
}

pub fn zlib_decode(data: &[u8]) -> NpadResult<Vec<u8>> {
    read_bounded(ZlibDecoder::new(data), "deflate", data.len() * 2)
}

pub fn zstd_encode(data: &[u8], level: u32) -> NpadResult<Vec<u8>> {
    let mut enc = zstd::stream::Encoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        level as i32,
    )?;
    enc.include_checksum(false)?;
    enc.set_pledged_src_size(Some(data.len() as u64))?;
    enc.write_all(data)?;
    Ok(enc.finish()?)
}

pub fn zstd_decode(data: &[u8]) -> NpadResult<Vec<u8>> {
    let decoder = zstd::stream::read::Decoder::new(data)
        .map_err(|e| NpadError::Decode(format!("zstd: {e}")))?;
    read_bounded(decoder, "zstd", data.len() * 2)
}
