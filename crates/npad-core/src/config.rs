//! Configuration schema (loaded from npad.toml)
//!
//! Compression and encryption parameters are not recorded per paste. Changing
//! `[compress]` or `[encrypt]` once pastes exist makes every stored paste
//! unreadable; wipe the store when changing them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NpadConfig {
    pub store: StoreConfig,
    pub compress: CompressConfig,
    pub encrypt: EncryptConfig,
    pub gc: GcConfig,
    pub log: LogConfig,
}

/// Which object backend holds paste payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// RAM-only map, lost on restart
    Memory,
    /// One file per paste in `store.dir`
    Fs,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => f.write_str("NON-PERSISTENT:RAM-ONLY"),
            BackendKind::Fs => f.write_str("PERSISTENT:FS"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend kind (default: memory)
    pub backend: BackendKind,
    /// Directory for the fs backend (default: /var/lib/npad)
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    /// "" (disabled), GZIP, DEFLATE or ZSTD
    pub algorithm: String,
    /// Compression level, 0 disables (GZIP/DEFLATE: 1-9, ZSTD: 1-19)
    pub level: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptConfig {
    /// "" (disabled), AESGCM, GCMSIV, AESSIV, CHACHA20POLY1305 or XCHACHA20POLY1305
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Remove expired pastes in the background (default: true)
    pub enabled: bool,
    /// Delay before the first sweep in seconds (default: 12)
    pub initial_delay_secs: u64,
    /// Seconds between sweeps (default: 1200)
    pub interval_secs: u64,
}

impl GcConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            dir: PathBuf::from("/var/lib/npad"),
        }
    }
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            algorithm: "GZIP".into(),
            level: 6,
        }
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_secs: 12,
            interval_secs: 20 * 60,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}
