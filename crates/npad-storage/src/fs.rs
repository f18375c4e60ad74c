//! Filesystem object backend: one file per paste in a flat directory
//!
//! The filename is exactly the storage key; there are no sidecar files. Writes
//! go to a dot-prefixed temp file and are renamed into place, so readers never
//! observe a partial payload. Dot files are invisible to `list`; temp files
//! orphaned by a crash are removed by `sweep` once they are an hour old.
//!
//! No in-process lock is taken: create, rename and remove are atomic at the
//! directory level, and storage keys are effectively unique per write.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use npad_core::config::BackendKind;
use npad_core::{NpadError, NpadResult};

use crate::backend::{ObjectBackend, SweepOutcome};

/// Permission bits for paste files on unix
#[cfg(unix)]
const FILE_MODE: u32 = 0o660;

const TEMP_SUFFIX: &str = ".tmp";

/// Temp files younger than this may belong to a `put` still in progress.
const STALE_TEMP_AGE: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct FsBackend {
    dir: PathBuf,
}

impl FsBackend {
    /// Open (creating if needed) the store directory at `dir`.
    pub fn open(dir: &Path) -> NpadResult<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            NpadError::Backend(format!("creating store dir {}: {e}", dir.display()))
        })?;
        if !dir.is_dir() {
            return Err(NpadError::Backend(format!(
                "store path is not a directory: {}",
                dir.display()
            )));
        }
        tracing::debug!(dir = %dir.display(), "fs backend opened");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> NpadResult<PathBuf> {
        let unsafe_char = |c: char| matches!(c, '/' | '\\' | '\0');
        if key.is_empty() || key.starts_with('.') || key.contains(unsafe_char) {
            return Err(NpadError::Backend(format!("refusing unsafe storage key [{key}]")));
        }
        Ok(self.dir.join(key))
    }

    fn read_dir(&self) -> NpadResult<Vec<fs::DirEntry>> {
        let listing_err =
            |e: std::io::Error| NpadError::Backend(format!("listing {}: {e}", self.dir.display()));
        fs::read_dir(&self.dir)
            .map_err(listing_err)?
            .map(|entry| entry.map_err(listing_err))
            .collect()
    }

    /// Split the directory into candidate keys (every non-dot entry, whatever
    /// its type) and temp files old enough to be orphans.
    fn scan(&self) -> NpadResult<(Vec<String>, Vec<PathBuf>)> {
        let now = SystemTime::now();
        let mut keys = Vec::new();
        let mut stale = Vec::new();
        for entry in self.read_dir()? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !name.starts_with('.') {
                keys.push(name);
                continue;
            }
            if !name.ends_with(TEMP_SUFFIX) {
                continue;
            }
            let modified = entry.metadata().and_then(|m| m.modified());
            let is_stale = modified
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .is_some_and(|age| age >= STALE_TEMP_AGE);
            if is_stale {
                stale.push(entry.path());
            }
        }
        Ok((keys, stale))
    }

    fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut opts = fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(FILE_MODE);
        }
        let mut file = opts.open(path)?;
        file.write_all(data)?;
        file.sync_all()
    }
}

impl ObjectBackend for FsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Fs
    }

    fn put(&self, key: &str, data: &[u8]) -> NpadResult<()> {
        let path = self.path_for(key)?;
        let tmp_path = self.dir.join(format!(".{key}{TEMP_SUFFIX}"));

        if let Err(e) = Self::write_file(&tmp_path, data) {
            let _ = fs::remove_file(&tmp_path);
            return Err(NpadError::Backend(format!(
                "writing {}: {e}",
                tmp_path.display()
            )));
        }
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            NpadError::Backend(format!("renaming into {}: {e}", path.display()))
        })
    }

    fn get(&self, key: &str) -> NpadResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NpadError::Backend(format!("reading {}: {e}", path.display()))),
        }
    }

    fn delete(&self, key: &str) -> NpadResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(NpadError::Backend(format!("removing {}: {e}", path.display()))),
        }
    }

    fn list(&self) -> NpadResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in self.read_dir()? {
            match entry.file_type() {
                Ok(ft) if ft.is_file() => {}
                _ => continue,
            }
            // Non-UTF-8 names can never be storage keys.
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            keys.push(name);
        }
        Ok(keys)
    }

    fn sweep(&self, expired: &dyn Fn(&str) -> bool) -> NpadResult<SweepOutcome> {
        let (keys, stale) = self.scan()?;
        let scanned = keys.len();
        let mut removed = Vec::new();
        let mut failed = 0;

        for key in keys.into_iter().filter(|k| expired(k)) {
            match self.delete(&key) {
                Ok(()) => {
                    tracing::debug!(key = %key, "gc: removed");
                    removed.push(key);
                }
                Err(e) => {
                    tracing::warn!(key = %key, "gc: remove failed: {e}");
                    failed += 1;
                }
            }
        }

        for path in stale {
            match fs::remove_file(&path) {
                Ok(()) => tracing::info!(path = %path.display(), "gc: removed stale temp file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), "gc: stale temp file: {e}"),
            }
        }

        let remaining = match self.scan() {
            Ok((keys, _)) => keys.len(),
            Err(e) => {
                tracing::error!("gc: post-sweep listing failed: {e}");
                scanned - removed.len()
            }
        };

        Ok(SweepOutcome {
            scanned,
            removed,
            failed,
            remaining,
        })
    }
}
