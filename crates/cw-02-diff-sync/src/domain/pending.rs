//! Single-slot "work pending" signal between the coalescing loop and the
//! diff loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

/// Raising an already raised flag is a no-op, so the diff loop runs at most
/// once per raise no matter how many triggers led to it.
#[derive(Debug, Default)]
pub struct PendingFlag {
    pending: AtomicBool,
    closed: AtomicBool,
    notify: Notify,
    // number of false -> true transitions
    signals: AtomicU64,
}

impl PendingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Returns false if it was already set or the flag is
    /// closed.
    pub fn raise(&self) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.signals.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
        true
    }

    /// Waits until the flag is raised and clears it.
    ///
    /// Returns false once the flag is closed with nothing pending.
    pub async fn wait(&self) -> bool {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending.swap(false, Ordering::AcqRel) {
                return true;
            }
            if self.closed.load(Ordering::Acquire) {
                return false;
            }
            notified.await;
        }
    }

    /// Wakes the waiter for good. A raise that happened before still
    /// delivers.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn signals(&self) -> u64 {
        self.signals.load(Ordering::Relaxed)
    }
}
