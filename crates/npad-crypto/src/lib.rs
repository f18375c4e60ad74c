//! npad-crypto: paste encryption and capability key derivation
//!
//! Pipeline: plaintext → compress → digest → seal → store
//!
//! Key derivation from the 48-byte digest `D`:
//! ```text
//! D          = SHA-384( SHA-512(payload) || decimal(now_ns) || 64 random bytes )
//! filename   = prefix "@" base64url(D)[..16]          (exposes D[0..12])
//! key        = SHA-512/256( D[16..48] )
//! nonce_seed = SHA-512/224( prefix || D[0..16] )      (nonce = first nonce_size bytes)
//! ```
//!
//! The server keeps only the filename. The key needs the second two thirds of
//! `D` and the nonce needs bytes the filename does not carry, so only the
//! holder of the full capability token can open a paste.

pub mod aead;
pub mod digest;

pub use aead::{open, seal, CipherAlgorithm};
pub use digest::{Digest, KeyMaterial};

/// Size of an AEAD key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the capability digest in bytes (SHA-384)
pub const DIGEST_SIZE: usize = 48;

/// Random bytes mixed into every digest
pub const RANDOM_SIZE: usize = 64;

/// Bytes available for nonces (SHA-512/224 output)
pub const NONCE_SEED_SIZE: usize = 28;

/// Base64 characters of the digest that appear in storage filenames
pub const FILENAME_SECRET_LEN: usize = 16;
