//! Background removal of expired pastes
//!
//! The collector only talks to the backend. Each pass asks the backend to
//! sweep every key whose `X` prefix is at or before the current time; `N` keys
//! and anything that does not parse as a key are left alone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use npad_core::clock::now_unix;
use npad_core::NpadResult;
use npad_storage::ObjectBackend;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::capability::is_expired;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcState {
    Idle,
    Sweeping,
}

/// Shared view of a collector's state, readable from any thread while the
/// collector runs on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct GcStatus(Arc<AtomicBool>);

impl GcStatus {
    pub fn state(&self) -> GcState {
        if self.0.load(Ordering::Acquire) {
            GcState::Sweeping
        } else {
            GcState::Idle
        }
    }

    fn set(&self, state: GcState) {
        self.0.store(state == GcState::Sweeping, Ordering::Release);
    }
}

/// Returns the status to `Idle` when a pass ends, including by panic.
struct SweepingGuard<'a>(&'a GcStatus);

impl<'a> SweepingGuard<'a> {
    fn enter(status: &'a GcStatus) -> Self {
        status.set(GcState::Sweeping);
        Self(status)
    }
}

impl Drop for SweepingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(GcState::Idle);
    }
}

/// Summary of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
    pub remaining: usize,
}

pub struct GarbageCollector {
    backend: Arc<dyn ObjectBackend>,
    status: GcStatus,
    was_empty_last_pass: bool,
}

impl GarbageCollector {
    pub fn new(backend: Arc<dyn ObjectBackend>) -> Self {
        Self::with_status(backend, GcStatus::default())
    }

    fn with_status(backend: Arc<dyn ObjectBackend>, status: GcStatus) -> Self {
        Self {
            backend,
            status,
            was_empty_last_pass: false,
        }
    }

    pub fn state(&self) -> GcState {
        self.status.state()
    }

    /// A handle that keeps reporting this collector's state after it has
    /// been moved into [`GarbageCollector::run`].
    pub fn status(&self) -> GcStatus {
        self.status.clone()
    }

    /// True if the previous pass found no pastes at all.
    pub fn was_empty_last_pass(&self) -> bool {
        self.was_empty_last_pass
    }

    /// Run one pass, removing every paste expired at `now_unix`.
    pub fn sweep(&mut self, now_unix: i64) -> NpadResult<SweepReport> {
        let outcome = {
            let _sweeping = SweepingGuard::enter(&self.status);
            debug!(now_unix, "gc: sweep start");
            self.backend.sweep(&|key: &str| is_expired(key, now_unix))?
        };

        let report = SweepReport {
            scanned: outcome.scanned,
            removed: outcome.removed.len(),
            failed: outcome.failed,
            remaining: outcome.remaining,
        };

        let backend = self.backend.kind();
        if report.scanned == 0 {
            // Only announce the transition into an empty store.
            if !self.was_empty_last_pass {
                info!(%backend, "gc: store is empty");
            }
            self.was_empty_last_pass = true;
        } else {
            self.was_empty_last_pass = false;
            info!(
                %backend,
                scanned = report.scanned,
                removed = report.removed,
                failed = report.failed,
                remaining = report.remaining,
                "gc: sweep complete"
            );
        }
        Ok(report)
    }

    /// Sweep after `initial_delay`, then every `interval`, until `shutdown`
    /// turns true or its sender is dropped.
    ///
    /// Sweeps run on the blocking pool. A failed sweep is logged and the next
    /// one runs on schedule; a sweep that panics loses the collector, which is
    /// rebuilt from the same backend and status.
    pub async fn run(
        mut self,
        initial_delay: Duration,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            backend = %self.backend.kind(),
            initial_delay_secs = initial_delay.as_secs(),
            interval_secs = interval.as_secs(),
            "gc: started"
        );

        if stopped_during(initial_delay, &mut shutdown).await {
            info!("gc: stopped");
            return;
        }

        let backend = self.backend.clone();
        let status = self.status.clone();
        loop {
            let now = now_unix();
            let joined = tokio::task::spawn_blocking(move || {
                let result = self.sweep(now);
                (self, result)
            })
            .await;

            match joined {
                Ok((gc, result)) => {
                    self = gc;
                    if let Err(e) = result {
                        error!("gc: sweep failed: {e}");
                    }
                }
                Err(e) => {
                    error!("gc: sweep task died, restarting collector: {e}");
                    self = GarbageCollector::with_status(backend.clone(), status.clone());
                }
            }

            if stopped_during(interval, &mut shutdown).await {
                break;
            }
        }
        info!("gc: stopped");
    }
}

/// Spawn a collector's `run` loop on the current runtime.
pub fn spawn(
    backend: Arc<dyn ObjectBackend>,
    initial_delay: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> (JoinHandle<()>, GcStatus) {
    let gc = GarbageCollector::new(backend);
    let status = gc.status();
    let handle = tokio::spawn(gc.run(initial_delay, interval, shutdown));
    (handle, status)
}

/// Wait `wait`, returning early with `true` if shutdown is requested.
async fn stopped_during(wait: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(wait);
    tokio::pin!(sleep);
    loop {
        if *shutdown.borrow_and_update() {
            return true;
        }
        tokio::select! {
            _ = &mut sleep => return false,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!("gc: shutdown sender dropped");
                    return true;
                }
            }
        }
    }
}
