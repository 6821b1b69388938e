//! Progress reporting and cooperative cancellation/pause.
//!
//! A [`Progress`] handle is passed through every pipeline call boundary
//! instead of living in ambient global state. Workers poll it between
//! logical units of work (per layer, per batch); the owning thread flips
//! the flags from outside.
//!
//! Pause blocks the polling worker on a condition variable, so a paused
//! worker holds no lock while it waits and wakes immediately on resume or
//! cancel.

use crate::error::{ResinError, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Default)]
struct Inner {
    completed: AtomicU32,
    total: AtomicU32,
    cancelled: AtomicBool,
    /// Lock-free mirror of `paused`, so per-run checkpoints stay cheap.
    paused_hint: AtomicBool,
    paused: Mutex<bool>,
    unpaused: Condvar,
}

/// Shared progress and cancellation context.
///
/// Cheap to clone; all clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    inner: Arc<Inner>,
}

impl Progress {
    /// Create a fresh context with no work registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the counters for a new phase of `total` work units.
    ///
    /// Cancellation and pause flags are left untouched; a cancelled
    /// context stays cancelled across phases.
    pub fn reset(&self, total: u32) {
        self.inner.completed.store(0, Ordering::Relaxed);
        self.inner.total.store(total, Ordering::Relaxed);
    }

    /// Record one completed work unit.
    pub fn increment(&self) {
        self.inner.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Completed work units in the current phase.
    pub fn completed(&self) -> u32 {
        self.inner.completed.load(Ordering::Relaxed)
    }

    /// Total work units registered for the current phase.
    pub fn total(&self) -> u32 {
        self.inner.total.load(Ordering::Relaxed)
    }

    /// Request cooperative cancellation and wake any paused workers.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        // Paused workers must wake to observe the cancellation.
        let _guard = self.inner.paused.lock().expect("progress mutex poisoned");
        self.inner.unpaused.notify_all();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Pause all workers at their next checkpoint.
    pub fn pause(&self) {
        let mut paused = self.inner.paused.lock().expect("progress mutex poisoned");
        *paused = true;
        self.inner.paused_hint.store(true, Ordering::SeqCst);
    }

    /// Resume paused workers.
    pub fn resume(&self) {
        let mut paused = self.inner.paused.lock().expect("progress mutex poisoned");
        *paused = false;
        self.inner.paused_hint.store(false, Ordering::SeqCst);
        self.inner.unpaused.notify_all();
    }

    /// Whether the context is currently paused.
    pub fn is_paused(&self) -> bool {
        self.inner.paused_hint.load(Ordering::SeqCst)
    }

    /// Block while paused, returning once resumed or cancelled.
    ///
    /// The fast path is a single atomic load; the mutex is only taken when
    /// a pause is actually pending, and the condition variable releases it
    /// for the duration of the wait.
    pub fn wait_if_paused(&self) {
        if !self.inner.paused_hint.load(Ordering::SeqCst) {
            return;
        }
        let mut paused = self.inner.paused.lock().expect("progress mutex poisoned");
        while *paused && !self.is_cancelled() {
            paused = self
                .inner
                .unpaused
                .wait(paused)
                .expect("progress mutex poisoned");
        }
    }

    /// Fail with [`ResinError::Cancelled`] when cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ResinError::Cancelled);
        }
        Ok(())
    }

    /// Worker checkpoint: honor a pause, then observe cancellation.
    pub fn checkpoint(&self) -> Result<()> {
        self.wait_if_paused();
        self.check_cancelled()
    }
}
