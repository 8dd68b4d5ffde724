//! Scoped acquire/release around an isolated worker's lifetime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use xlesson_sandbox_js::CancelFlag;

/// Counts workers whose blocking thread has not returned yet, or whose process has
/// not exited or been killed yet.
#[derive(Debug, Clone, Default)]
pub struct WorkerTracker {
    live: Arc<AtomicUsize>,
}

impl WorkerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Register a new worker. The count drops again when the lease is dropped: on
    /// the worker thread once the job returns, or after the worker process is gone.
    pub fn lease(&self) -> WorkerLease {
        self.live.fetch_add(1, Ordering::SeqCst);
        WorkerLease {
            live: self.live.clone(),
            cancel: CancelFlag::new(),
        }
    }
}

/// One live worker. Dropping it releases the slot and raises the worker's cancel flag.
#[derive(Debug)]
pub struct WorkerLease {
    live: Arc<AtomicUsize>,
    cancel: CancelFlag,
}

impl WorkerLease {
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.live.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!("worker released");
    }
}

/// Held by the awaiting side. Raises the cancel flag however the wait ends:
/// result, inner timeout, or the whole future being dropped by the outer timeout.
#[derive(Debug)]
pub struct CancelOnDrop(pub CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
