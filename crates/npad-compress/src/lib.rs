//! npad-compress: pluggable paste compression
//!
//! # Overview
//! - `algorithm`: the closed set of supported codecs and their level limits
//! - `codec`: the gzip / deflate (zlib framing) / zstd backends
//!
//! Level 0 or [`CompressionAlgorithm::Identity`] is a passthrough. Levels above
//! an algorithm's maximum are clamped, never rejected. Corrupt input surfaces as
//! [`npad_core::NpadError::Decode`].

pub mod algorithm;
pub mod codec;

pub use algorithm::CompressionAlgorithm;

use npad_core::NpadResult;

/// Compress `data` with `algorithm` at `level`.
pub fn compress(algorithm: CompressionAlgorithm, level: u32, data: &[u8]) -> NpadResult<Vec<u8>> {
    if level == 0 {
        return Ok(data.to_vec());
    }
    let level = algorithm.clamp_level(level);
    match algorithm {
        CompressionAlgorithm::Identity => Ok(data.to_vec()),
        CompressionAlgorithm::Gzip => codec::gzip_encode(data, level),
        CompressionAlgorithm::Deflate => codec::zlib_encode(data, level),
        CompressionAlgorithm::Zstd => codec::zstd_encode(data, level),
    }
}

/// Decompress `data` produced by [`compress`] with the same `algorithm`.
pub fn decompress(algorithm: CompressionAlgorithm, data: &[u8]) -> NpadResult<Vec<u8>> {
    match algorithm {
        CompressionAlgorithm::Identity => Ok(data.to_vec()),
        CompressionAlgorithm::Gzip => codec::gzip_decode(data),
        CompressionAlgorithm::Deflate => codec::zlib_decode(data),
        CompressionAlgorithm::Zstd => codec::zstd_decode(data),
    }
}

/// The validated compression setting of a running store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compressor {
    algorithm: CompressionAlgorithm,
    level: u32,
}

impl Compressor {
    /// Passthrough compressor.
    pub const DISABLED: Compressor = Compressor {
        algorithm: CompressionAlgorithm::Identity,
        level: 0,
    };

    /// Build a compressor, clamping `level` to the algorithm's maximum.
    pub fn new(algorithm: CompressionAlgorithm, level: u32) -> Self {
        let clamped = algorithm.clamp_level(level);
        if clamped != level && algorithm != CompressionAlgorithm::Identity {
            tracing::warn!(
                algorithm = %algorithm,
                requested = level,
                clamped,
                "compression level above maximum, clamping"
            );
        }
        Self {
            algorithm,
            level: clamped,
        }
    }

    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// True when payloads are stored exactly as submitted.
    pub fn is_passthrough(&self) -> bool {
        self.level == 0 || self.algorithm == CompressionAlgorithm::Identity
    }

    pub fn compress(&self, data: &[u8]) -> NpadResult<Vec<u8>> {
        if self.is_passthrough() {
            return Ok(data.to_vec());
        }
        compress(self.algorithm, self.level, data)
    }

    pub fn decompress(&self, data: &[u8]) -> NpadResult<Vec<u8>> {
        if self.is_passthrough() {
            return Ok(data.to_vec());
        }
        decompress(self.algorithm, data)
    }
}

impl std::fmt::Display for Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_passthrough() {
            f.write_str("DISABLED")
        } else {
            write!(f, "{}:{}", self.algorithm, self.level)
        }
    }
}
