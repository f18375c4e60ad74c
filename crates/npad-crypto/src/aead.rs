//! AEAD seal/open over an explicit key and nonce
//!
//! Sealed payload format (binary):
//! ```text
//! [N bytes: ciphertext][16 bytes: tag]
//! ```
//! No nonce is stored: it is re-derived from the capability token on read.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use aes_gcm_siv::Aes256GcmSiv;
use aes_siv::Aes128SivAead;
use chacha20poly1305::{ChaCha20Poly1305, XChaCha20Poly1305};
use npad_core::{NpadError, NpadResult};

use crate::KEY_SIZE;

/// Closed set of supported AEAD constructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    /// AES-256-GCM
    AesGcm,
    /// AES-256-GCM-SIV (RFC 8452), nonce-misuse resistant
    GcmSiv,
    /// AES-SIV (CMAC-AES-128 + CTR, 256-bit key), nonce-misuse resistant
    AesSiv,
    /// ChaCha20-Poly1305 (RFC 8439)
    ChaCha20Poly1305,
    /// XChaCha20-Poly1305 (192-bit nonce)
    XChaCha20Poly1305,
}

impl CipherAlgorithm {
    pub const ALL: [CipherAlgorithm; 5] = [
        CipherAlgorithm::AesGcm,
        CipherAlgorithm::GcmSiv,
        CipherAlgorithm::AesSiv,
        CipherAlgorithm::ChaCha20Poly1305,
        CipherAlgorithm::XChaCha20Poly1305,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CipherAlgorithm::AesGcm => "AESGCM",
            CipherAlgorithm::GcmSiv => "GCMSIV",
            CipherAlgorithm::AesSiv => "AESSIV",
            CipherAlgorithm::ChaCha20Poly1305 => "CHACHA20POLY1305",
            CipherAlgorithm::XChaCha20Poly1305 => "XCHACHA20POLY1305",
        }
    }

    /// Nonce length consumed by this construction.
    pub fn nonce_size(self) -> usize {
        match self {
            CipherAlgorithm::AesGcm => 12,
            CipherAlgorithm::GcmSiv => 12,
            CipherAlgorithm::AesSiv => 16,
            CipherAlgorithm::ChaCha20Poly1305 => 12,
            CipherAlgorithm::XChaCha20Poly1305 => 24,
        }
    }

    /// Parse a configured algorithm name. Empty or `NONE` means disabled.
    pub fn parse_optional(s: &str) -> NpadResult<Option<CipherAlgorithm>> {
        match s.trim() {
            "" => Ok(None),
            s if s.eq_ignore_ascii_case("NONE") => Ok(None),
            s => s.parse().map(Some),
        }
    }
}

impl FromStr for CipherAlgorithm {
    type Err = NpadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AESGCM" => Ok(CipherAlgorithm::AesGcm),
            "GCMSIV" => Ok(CipherAlgorithm::GcmSiv),
            "AESSIV" => Ok(CipherAlgorithm::AesSiv),
            "CHACHA20POLY1305" => Ok(CipherAlgorithm::ChaCha20Poly1305),
            "XCHACHA20POLY1305" => Ok(CipherAlgorithm::XChaCha20Poly1305),
            other => Err(NpadError::Config(format!(
                "unsupported encryption algorithm [{other}]"
            ))),
        }
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encrypt `plaintext` under `key` and the first `nonce_size()` bytes of `nonce`.
pub fn seal(
    algorithm: CipherAlgorithm,
    key: &[u8; KEY_SIZE],
    nonce: &[u8],
    plaintext: &[u8],
) -> NpadResult<Vec<u8>> {
    check_key_material(algorithm, key, nonce)?;
    match algorithm {
        CipherAlgorithm::AesGcm => seal_with::<Aes256Gcm>(key, nonce, plaintext),
        CipherAlgorithm::GcmSiv => seal_with::<Aes256GcmSiv>(key, nonce, plaintext),
        CipherAlgorithm::AesSiv => seal_with::<Aes128SivAead>(key, nonce, plaintext),
        CipherAlgorithm::ChaCha20Poly1305 => seal_with::<ChaCha20Poly1305>(key, nonce, plaintext),
        CipherAlgorithm::XChaCha20Poly1305 => {
            seal_with::<XChaCha20Poly1305>(key, nonce, plaintext)
        }
    }
}

/// Decrypt and authenticate `ciphertext`.
///
/// Any tag mismatch yields [`NpadError::AuthenticationFailure`]; no partial
/// plaintext is ever returned.
pub fn open(
    algorithm: CipherAlgorithm,
    key: &[u8; KEY_SIZE],
    nonce: &[u8],
    ciphertext: &[u8],
) -> NpadResult<Vec<u8>> {
    check_key_material(algorithm, key, nonce)?;
    match algorithm {
        CipherAlgorithm::AesGcm => open_with::<Aes256Gcm>(key, nonce, ciphertext),
        CipherAlgorithm::GcmSiv => open_with::<Aes256GcmSiv>(key, nonce, ciphertext),
        CipherAlgorithm::AesSiv => open_with::<Aes128SivAead>(key, nonce, ciphertext),
        CipherAlgorithm::ChaCha20Poly1305 => open_with::<ChaCha20Poly1305>(key, nonce, ciphertext),
        CipherAlgorithm::XChaCha20Poly1305 => {
            open_with::<XChaCha20Poly1305>(key, nonce, ciphertext)
        }
    }
}

fn check_key_material(
    algorithm: CipherAlgorithm,
    key: &[u8; KEY_SIZE],
    nonce: &[u8],
) -> NpadResult<()> {
    if key.iter().all(|b| *b == 0) {
        return Err(NpadError::InvalidKeyMaterial(format!(
            "[{algorithm}] all-zero key"
        )));
    }
    if nonce.len() < algorithm.nonce_size() {
        return Err(NpadError::InvalidKeyMaterial(format!(
            "[{algorithm}] nonce too short: {} bytes (minimum {})",
            nonce.len(),
            algorithm.nonce_size()
        )));
    }
    Ok(())
}

fn seal_with<C: KeyInit + Aead>(
    key: &[u8; KEY_SIZE],
    nonce: &[u8],
    plaintext: &[u8],
) -> NpadResult<Vec<u8>> {
    let cipher = C::new_from_slice(key)
        .map_err(|_| NpadError::InvalidKeyMaterial("key length rejected".into()))?;
    let nonce = GenericArray::from_slice(&nonce[..<C::NonceSize as Unsigned>::USIZE]);
    cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| NpadError::InvalidKeyMaterial("encryption failed".into()))
}

fn open_with<C: KeyInit + Aead>(
    key: &[u8; KEY_SIZE],
    nonce: &[u8],
    ciphertext: &[u8],
) -> NpadResult<Vec<u8>> {
    let cipher = C::new_from_slice(key)
        .map_err(|_| NpadError::InvalidKeyMaterial("key length rejected".into()))?;
    let nonce = GenericArray::from_slice(&nonce[..<C::NonceSize as Unsigned>::USIZE]);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| NpadError::AuthenticationFailure)
}
