//! Supported compression algorithms

use std::fmt;
use std::str::FromStr;

use npad_core::NpadError;

/// Closed set of paste compression codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    /// No compression
    Identity,
    /// gzip (RFC 1952)
    Gzip,
    /// deflate in zlib framing (RFC 1950)
    Deflate,
    /// Zstandard
    Zstd,
}

impl CompressionAlgorithm {
    pub const ALL: [CompressionAlgorithm; 4] = [
        CompressionAlgorithm::Identity,
        CompressionAlgorithm::Gzip,
        CompressionAlgorithm::Deflate,
        CompressionAlgorithm::Zstd,
    ];

    /// Canonical configuration name
    pub fn name(self) -> &'static str {
        match self {
            CompressionAlgorithm::Identity => "",
            CompressionAlgorithm::Gzip => "GZIP",
            CompressionAlgorithm::Deflate => "DEFLATE",
            CompressionAlgorithm::Zstd => "ZSTD",
        }
    }

    /// Highest accepted level; anything above is clamped.
    pub fn max_level(self) -> u32 {
        match self {
            CompressionAlgorithm::Identity => 0,
            CompressionAlgorithm::Gzip | CompressionAlgorithm::Deflate => 9,
            CompressionAlgorithm::Zstd => 19,
        }
    }

    pub fn clamp_level(self, level: u32) -> u32 {
        level.min(self.max_level())
    }

    /// File extension for raw payloads, including the leading dot.
    pub fn file_extension(self) -> &'static str {
        match self {
            CompressionAlgorithm::Identity => "",
            CompressionAlgorithm::Gzip => ".gz",
            CompressionAlgorithm::Deflate => ".deflate",
            CompressionAlgorithm::Zstd => ".zst",
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = NpadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "NONE" => Ok(CompressionAlgorithm::Identity),
            "GZIP" => Ok(CompressionAlgorithm::Gzip),
            "DEFLATE" => Ok(CompressionAlgorithm::Deflate),
            "ZSTD" => Ok(CompressionAlgorithm::Zstd),
            other => Err(NpadError::Config(format!(
                "unsupported compression algorithm [{other}]"
            ))),
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionAlgorithm::Identity => f.write_str("NONE"),
            other => f.write_str(other.name()),
        }
    }
}
