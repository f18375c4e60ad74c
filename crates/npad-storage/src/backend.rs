//! Object backend trait and startup selection

use std::sync::Arc;

use npad_core::config::{BackendKind, StoreConfig};
use npad_core::NpadResult;

use crate::fs::FsBackend;
use crate::memory::MemoryBackend;

/// Durable key → bytes storage for paste payloads.
///
/// # Invariants
///
/// - Keys are storage keys (`<prefix>@<secret16>[@<name>]`); values are
///   opaque payloads and never interpreted.
/// - `get` on a missing key returns `Ok(None)`, never an error.
/// - `delete` of a missing key is a no-op.
/// - I/O failures are reported to the caller and not retried.
/// - Implementations must be `Send + Sync`; concurrent request handlers and
///   the garbage collector share one instance.
pub trait ObjectBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Store `data` under `key`, replacing any previous value.
    fn put(&self, key: &str, data: &[u8]) -> NpadResult<()>;

    /// Fetch the payload stored under `key`.
    fn get(&self, key: &str) -> NpadResult<Option<Vec<u8>>>;

    fn delete(&self, key: &str) -> NpadResult<()>;

    /// Snapshot of all keys. Every call takes a fresh listing.
    fn list(&self) -> NpadResult<Vec<String>>;

    /// Number of stored objects.
    fn len(&self) -> NpadResult<usize> {
        Ok(self.list()?.len())
    }

    fn is_empty(&self) -> NpadResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every key for which `expired` returns true.
    ///
    /// This is one garbage-collection pass. A failure to remove a single key
    /// is logged and counted in [`SweepOutcome::failed`]; only a failure to
    /// list the keys at all is returned as an error.
    fn sweep(&self, expired: &dyn Fn(&str) -> bool) -> NpadResult<SweepOutcome>;
}

/// Result of one backend sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Keys present when the sweep started
    pub scanned: usize,
    /// Keys removed by this sweep
    pub removed: Vec<String>,
    /// Expired keys that could not be removed
    pub failed: usize,
    /// Keys present after the sweep
    pub remaining: usize,
}

/// Build the backend selected in the configuration.
pub fn build_backend(cfg: &StoreConfig) -> NpadResult<Arc<dyn ObjectBackend>> {
    match cfg.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
        BackendKind::Fs => Ok(Arc::new(FsBackend::open(&cfg.dir)?)),
    }
}
