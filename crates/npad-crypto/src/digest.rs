//! Capability digest and the key material derived from it

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use npad_core::{NpadError, NpadResult};
use rand::RngCore;
use sha2::{Digest as _, Sha384, Sha512, Sha512_224, Sha512_256};
use zeroize::Zeroize;

use crate::{DIGEST_SIZE, FILENAME_SECRET_LEN, KEY_SIZE, NONCE_SEED_SIZE, RANDOM_SIZE};

/// The 48-byte secret behind a capability token. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Digest {
    bytes: [u8; DIGEST_SIZE],
}

impl Digest {
    /// Derive a fresh digest for `payload` created at `now_ns`.
    pub fn derive(payload: &[u8], now_ns: u128) -> Self {
        let mut random = [0u8; RANDOM_SIZE];
        rand::thread_rng().fill_bytes(&mut random);
        let digest = Self::derive_with(payload, now_ns, &random);
        random.zeroize();
        digest
    }

    /// `SHA-384( SHA-512(payload) || decimal(now_ns) || random )`
    pub fn derive_with(payload: &[u8], now_ns: u128, random: &[u8; RANDOM_SIZE]) -> Self {
        let content = Sha512::digest(payload);
        let out = Sha384::new()
            .chain_update(content)
            .chain_update(now_ns.to_string().as_bytes())
            .chain_update(random)
            .finalize();
        let mut bytes = [0u8; DIGEST_SIZE];
        bytes.copy_from_slice(&out);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.bytes
    }

    /// URL-safe unpadded base64 (64 characters).
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.bytes)
    }

    /// The truncated form that appears in storage filenames.
    pub fn filename_secret(&self) -> String {
        let mut encoded = self.encode();
        encoded.truncate(FILENAME_SECRET_LEN);
        encoded
    }

    /// Decode the full secret field of a capability token.
    pub fn decode(secret: &str) -> NpadResult<Self> {
        let mut raw = URL_SAFE_NO_PAD
            .decode(secret)
            .map_err(|e| NpadError::InvalidToken(format!("secret is not base64url: {e}")))?;
        if raw.len() != DIGEST_SIZE {
            let len = raw.len();
            raw.zeroize();
            return Err(NpadError::InvalidToken(format!(
                "secret decodes to {len} bytes (expected {DIGEST_SIZE})"
            )));
        }
        let mut bytes = [0u8; DIGEST_SIZE];
        bytes.copy_from_slice(&raw);
        raw.zeroize();
        Ok(Self { bytes })
    }

    /// Derive the AEAD key and nonce seed bound to `prefix`.
    ///
    /// The key depends only on `D[16..48]`, the nonce only on `prefix` and
    /// `D[0..16]`.
    pub fn key_material(&self, prefix: &str) -> KeyMaterial {
        let key_hash = Sha512_256::digest(&self.bytes[16..]);
        let nonce_hash = Sha512_224::new()
            .chain_update(prefix.as_bytes())
            .chain_update(&self.bytes[..16])
            .finalize();

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&key_hash);
        let mut nonce_seed = [0u8; NONCE_SEED_SIZE];
        nonce_seed.copy_from_slice(&nonce_hash);
        KeyMaterial { key, nonce_seed }
    }
}

impl Drop for Digest {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digest")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Per-paste AEAD key and nonce seed. Never persisted; zeroized on drop.
pub struct KeyMaterial {
    key: [u8; KEY_SIZE],
    nonce_seed: [u8; NONCE_SEED_SIZE],
}

impl KeyMaterial {
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    /// Nonce seed; ciphers consume its first `nonce_size()` bytes.
    pub fn nonce(&self) -> &[u8; NONCE_SEED_SIZE] {
        &self.nonce_seed
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
        self.nonce_seed.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"[REDACTED]")
            .field("nonce_seed", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_digest() -> Digest {
        Digest::derive_with(b"hello world", 1_700_000_000_123_456_789, &[9u8; RANDOM_SIZE])
    }

    #[test]
    fn test_derive_is_deterministic_for_fixed_inputs() {
        assert_eq!(fixed_digest(), fixed_digest());
    }

    #[test]
    fn test_derive_mixes_all_inputs() {
        let base = fixed_digest();
        let other_payload =
            Digest::derive_with(b"hello world!", 1_700_000_000_123_456_789, &[9u8; RANDOM_SIZE]);
        let other_time =
            Digest::derive_with(b"hello world", 1_700_000_000_123_456_790, &[9u8; RANDOM_SIZE]);
        let other_random =
            Digest::derive_with(b"hello world", 1_700_000_000_123_456_789, &[8u8; RANDOM_SIZE]);
        assert_ne!(base, other_payload);
        assert_ne!(base, other_time);
        assert_ne!(base, other_random);
    }

    #[test]
    fn test_fresh_digests_differ() {
        let a = Digest::derive(b"same", 42);
        let b = Digest::derive(b"same", 42);
        assert_ne!(a, b, "random component must make digests unique");
    }

    #[test]
    fn test_encoding_lengths() {
        let d = fixed_digest();
        assert_eq!(d.encode().len(), 64);
        assert_eq!(d.filename_secret().len(), FILENAME_SECRET_LEN);
        assert!(d.encode().starts_with(&d.filename_secret()));
    }

    #[test]
    fn test_decode_roundtrip() {
        let d = fixed_digest();
        assert_eq!(Digest::decode(&d.encode()).unwrap(), d);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let d = fixed_digest();
        assert!(matches!(
            Digest::decode(&d.filename_secret()),
            Err(NpadError::InvalidToken(_))
        ));
        assert!(matches!(
            Digest::decode("not*base64!"),
            Err(NpadError::InvalidToken(_))
        ));
        let padded = format!("{}==", &d.encode()[..62]);
        assert!(Digest::decode(&padded).is_err());
    }

    #[test]
    fn test_key_material_binds_prefix() {
        let d = fixed_digest();
        let a = d.key_material("X1700001200");
        let b = d.key_material("X1700001201");
        assert_eq!(a.key(), b.key(), "key depends only on D[16..48]");
        assert_ne!(a.nonce(), b.nonce(), "nonce depends on the prefix");
    }

    /// Knowing the filename (first 12 bytes of D) must not fix key or nonce.
    #[test]
    fn test_filename_does_not_determine_key_material() {
        let d = fixed_digest();
        let mut forged = *d.as_bytes();
        for b in &mut forged[12..] {
            *b ^= 0x5A;
        }
        let forged = Digest::from_bytes(forged);
        assert_eq!(d.filename_secret(), forged.filename_secret());

        let real = d.key_material("X1700001200");
        let guess = forged.key_material("X1700001200");
        assert_ne!(real.key(), guess.key());
        assert_ne!(real.nonce(), guess.nonce());
    }

    /// Bytes 12..16 are not in the filename yet feed the nonce.
    #[test]
    fn test_nonce_depends_on_hidden_first_half_bytes() {
        let d = fixed_digest();
        let mut forged = *d.as_bytes();
        forged[13] ^= 0x01;
        let forged = Digest::from_bytes(forged);
        assert_eq!(d.filename_secret(), forged.filename_secret());
        assert_eq!(
            d.key_material("N1").key(),
            forged.key_material("N1").key()
        );
        assert_ne!(
            d.key_material("N1").nonce(),
            forged.key_material("N1").nonce()
        );
    }

    #[test]
    fn test_debug_redacts() {
        let d = fixed_digest();
        let km = d.key_material("N1");
        assert!(format!("{d:?}").contains("REDACTED"));
        assert!(format!("{km:?}").contains("REDACTED"));
    }

    proptest! {
        #[test]
        fn encode_decode_roundtrip(
            bytes in proptest::array::uniform32(any::<u8>()),
            tail in proptest::array::uniform16(any::<u8>()),
        ) {
            let mut raw = [0u8; DIGEST_SIZE];
            raw[..32].copy_from_slice(&bytes);
            raw[32..].copy_from_slice(&tail);
            let d = Digest::from_bytes(raw);
            let back = Digest::decode(&d.encode()).unwrap();
            prop_assert_eq!(back.as_bytes(), d.as_bytes());
        }
    }
}
