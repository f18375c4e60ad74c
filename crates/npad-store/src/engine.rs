//! Store and retrieve pastes against an object backend

use std::sync::Arc;
use std::time::SystemTime;

use npad_core::clock::now_unix;
use npad_core::{NpadError, NpadResult, RetentionClass};
use npad_crypto::open;
use npad_storage::ObjectBackend;
use tracing::debug;

use crate::capability::{self, build_token, parse_token};
use crate::settings::StoreSettings;

/// Shared handle to a paste store. Cheap to clone; safe to use from many
/// request handlers at once.
///
/// Compression and encryption happen before the backend is touched, so no
/// backend lock is held while they run. Only storage keys are logged, never
/// tokens or key material.
#[derive(Clone)]
pub struct PasteStore {
    settings: Arc<StoreSettings>,
    backend: Arc<dyn ObjectBackend>,
}

impl PasteStore {
    pub fn new(settings: StoreSettings, backend: Arc<dyn ObjectBackend>) -> Self {
        Self {
            settings: Arc::new(settings),
            backend,
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn backend(&self) -> &Arc<dyn ObjectBackend> {
        &self.backend
    }

    /// Store `plaintext` and return its capability token.
    pub fn store(&self, plaintext: &[u8], class: RetentionClass, name: &str) -> NpadResult<String> {
        self.store_at(plaintext, class, name, SystemTime::now())
    }

    /// [`store`](Self::store) with an explicit creation time.
    pub fn store_at(
        &self,
        plaintext: &[u8],
        class: RetentionClass,
        name: &str,
        now: SystemTime,
    ) -> NpadResult<String> {
        let sealed = build_token(&self.settings, plaintext, class, name, now)?;
        self.backend.put(&sealed.storage_key, &sealed.payload)?;
        debug!(
            key = %sealed.storage_key,
            class = class.as_u8(),
            plaintext_bytes = plaintext.len(),
            stored_bytes = sealed.payload.len(),
            "paste stored"
        );
        Ok(sealed.token)
    }

    /// Fetch the paste behind `token`.
    ///
    /// With `raw` the stored compression is left in place. A paste whose
    /// expiry has passed is reported as missing even before the collector
    /// removes it.
    pub fn retrieve(&self, token: &str, raw: bool) -> NpadResult<Vec<u8>> {
        self.retrieve_at(token, raw, now_unix())
    }

    /// [`retrieve`](Self::retrieve) against an explicit clock.
    pub fn retrieve_at(&self, token: &str, raw: bool, now_unix: i64) -> NpadResult<Vec<u8>> {
        let parsed = parse_token(&self.settings, token)?;
        if parsed.prefix.is_expired(now_unix) {
            debug!(key = %parsed.storage_key, "paste expired");
            return Err(NpadError::NotFound);
        }

        let stored = self
            .backend
            .get(&parsed.storage_key)?
            .ok_or(NpadError::NotFound)?;
        debug!(key = %parsed.storage_key, stored_bytes = stored.len(), "paste read");

        let payload = match self.settings.cipher {
            Some(cipher) => {
                let secret = parsed
                    .secret
                    .as_ref()
                    .ok_or_else(|| NpadError::InvalidToken("missing secret".into()))?;
                let km = secret.key_material(parsed.prefix_field());
                open(cipher, km.key(), km.nonce(), &stored)?
            }
            None => stored,
        };

        if raw {
            return Ok(payload);
        }
        self.settings.compressor.decompress(&payload)
    }

    /// Whether `token` has expired by the current clock.
    pub fn is_expired(&self, token: &str) -> bool {
        capability::is_expired(token, now_unix())
    }
}

impl std::fmt::Debug for PasteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasteStore")
            .field("settings", &self.settings)
            .field("backend", &self.backend.kind())
            .finish()
    }
}
