//! Validated store settings, built once at startup

use std::fmt;

use npad_compress::{CompressionAlgorithm, Compressor};
use npad_core::config::{BackendKind, NpadConfig};
use npad_core::NpadResult;
use npad_crypto::CipherAlgorithm;

/// Compression, encryption and backend selection of a running store.
///
/// Neither the compressor nor the cipher is recorded per paste: a store opened
/// with different settings than the ones its pastes were written with cannot
/// read them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    pub compressor: Compressor,
    pub cipher: Option<CipherAlgorithm>,
    pub backend: BackendKind,
}

impl StoreSettings {
    pub fn new(
        compressor: Compressor,
        cipher: Option<CipherAlgorithm>,
        backend: BackendKind,
    ) -> Self {
        Self {
            compressor,
            cipher,
            backend,
        }
    }

    /// No compression, no encryption, memory backend.
    pub fn plain() -> Self {
        Self::new(Compressor::DISABLED, None, BackendKind::Memory)
    }

    /// Validate the algorithm names in `cfg`.
    ///
    /// This is the only place a [`npad_core::NpadError::Config`] is produced;
    /// unsupported names fail here instead of on the first request.
    pub fn from_config(cfg: &NpadConfig) -> NpadResult<Self> {
        let algorithm: CompressionAlgorithm = cfg.compress.algorithm.parse()?;
        let compressor = Compressor::new(algorithm, cfg.compress.level);
        let cipher = CipherAlgorithm::parse_optional(&cfg.encrypt.algorithm)?;
        Ok(Self::new(compressor, cipher, cfg.store.backend))
    }
}

impl fmt::Display for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[STORE:{}] [COMPRESS:{}] [ENCRYPT:",
            self.backend, self.compressor
        )?;
        match self.cipher {
            Some(cipher) => write!(f, "{cipher}]"),
            None => f.write_str("DISABLED]"),
        }
    }
}
