//! In-memory object backend.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use npad_core::config::BackendKind;
use npad_core::NpadResult;

use crate::backend::{ObjectBackend, SweepOutcome};

/// RAM-only backend: a single map behind a read/write lock.
///
/// `put`, `delete` and `sweep` take the exclusive lock, `get` and `list` the
/// shared one. The lock is only held for the map operation itself. Entries
/// vanish on restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-applied map
    // operation behind, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ObjectBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn put(&self, key: &str, data: &[u8]) -> NpadResult<()> {
        self.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> NpadResult<Option<Vec<u8>>> {
        Ok(self.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> NpadResult<()> {
        self.write().remove(key);
        Ok(())
    }

    fn list(&self) -> NpadResult<Vec<String>> {
        Ok(self.read().keys().cloned().collect())
    }

    fn len(&self) -> NpadResult<usize> {
        Ok(self.read().len())
    }

    fn sweep(&self, expired: &dyn Fn(&str) -> bool) -> NpadResult<SweepOutcome> {
        let mut objects = self.write();
        let scanned = objects.len();
        let removed: Vec<String> = objects.keys().filter(|k| expired(k)).cloned().collect();
        for key in &removed {
            objects.remove(key);
            tracing::debug!(key = %key, "gc: removed");
        }
        let remaining = objects.len();
        drop(objects);

        // Freed capacity is reclaimed in a second, short critical section.
        if !removed.is_empty() {
            self.write().shrink_to_fit();
        }

        Ok(SweepOutcome {
            scanned,
            removed,
            failed: 0,
            remaining,
        })
    }
}
