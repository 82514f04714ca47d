//! # Request Handler (Push Coalescer)
//!
//! One per viewer and topic. Two loops share the viewer's interest window:
//!
//! - [`RequestHandler::handle_requests`] (diff loop) waits on the pending
//!   flag, diffs the interest window against a store snapshot, queues the
//!   encoded frames and sleeps `debounce`.
//! - [`RequestHandler::pushes_to_requests`] (coalescing loop) drains the
//!   trigger queue in batches and raises the pending flag when any trigger
//!   lands inside the interest window. With nothing relevant it waits for one
//!   more trigger, sleeps `batch_interval`, then looks again.
//!
//! Closing the trigger queue ends the coalescing loop, which closes the
//! pending flag, which ends the diff loop.

use crate::domain::{DataRequest, PendingFlag, SyncConfig};
use crate::wire::{encode_diff, StatusMessage};
use bytes::Bytes;
use cw_01_window_store::{DagError, StatusCursor, WindowStoreApi};
use parking_lot::Mutex;
use serde::Serialize;
use shared_bus::{trigger_queue, QueueRecv, TriggerQueue, TriggerReceiver};
use shared_types::{Index, Topic};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Counters for one handler.
#[derive(Debug, Default)]
pub struct HandlerStats {
    /// Diffs computed
    pub diffs: AtomicU64,
    /// Frames queued for the viewer
    pub frames: AtomicU64,
    /// Triggers overwritten before the coalescer read them
    pub lagged: AtomicU64,
}

/// Plain copy of [`HandlerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HandlerCounters {
    pub diffs: u64,
    pub frames: u64,
    pub lagged: u64,
    pub signals: u64,
}

pub struct RequestHandler {
    topic: Topic,
    store: Arc<dyn WindowStoreApi>,
    cursor: Mutex<StatusCursor>,
    last_request: Mutex<Option<DataRequest>>,
    pending: PendingFlag,
    pushes: TriggerQueue,
    outbound: mpsc::Sender<Bytes>,
    config: SyncConfig,
    stats: HandlerStats,
}

impl RequestHandler {
    /// Creates a handler and the receiving end of its trigger queue, which
    /// goes to [`RequestHandler::pushes_to_requests`].
    pub fn new(
        topic: Topic,
        store: Arc<dyn WindowStoreApi>,
        outbound: mpsc::Sender<Bytes>,
        config: SyncConfig,
    ) -> (Arc<Self>, TriggerReceiver) {
        let (pushes, receiver) = trigger_queue(config.trigger_queue_capacity);
        let cursor = store.empty_status(config.window_size);
        let handler = Arc::new(Self {
            topic,
            store,
            cursor: Mutex::new(cursor),
            last_request: Mutex::new(None),
            pending: PendingFlag::new(),
            pushes,
            outbound,
            config,
            stats: HandlerStats::default(),
        });
        (handler, receiver)
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Overwrites the cursor with the viewer's own report.
    pub fn update_status(&self, start: Index, counts: &[u32]) -> Result<(), DagError> {
        self.cursor.lock().update_status(start, counts)
    }

    /// Replaces the interest window and schedules a diff.
    pub fn make_request(&self, start: Index, end: Index) {
        *self.last_request.lock() = Some(DataRequest::new(start, end));
        self.pending.raise();
    }

    /// Applies a status frame: cursor first, then the interest window it
    /// declares.
    pub fn on_status(&self, msg: &StatusMessage) -> Result<(), DagError> {
        self.update_status(msg.start, &msg.counts)?;
        self.make_request(msg.start, msg.end());
        Ok(())
    }

    /// Queues a trigger. Never blocks; a full queue loses its oldest entry.
    pub fn push(&self, index: Index) -> bool {
        self.pushes.push(index)
    }

    /// Closes the trigger queue, which winds down both loops.
    pub fn close(&self) {
        self.pushes.close();
    }

    pub fn last_request(&self) -> Option<DataRequest> {
        *self.last_request.lock()
    }

    pub fn pending(&self) -> &PendingFlag {
        &self.pending
    }

    pub fn counters(&self) -> HandlerCounters {
        HandlerCounters {
            diffs: self.stats.diffs.load(Ordering::Relaxed),
            frames: self.stats.frames.load(Ordering::Relaxed),
            lagged: self.stats.lagged.load(Ordering::Relaxed),
            signals: self.pending.signals(),
        }
    }

    /// Diff loop.
    pub async fn handle_requests(self: Arc<Self>) {
        while self.pending.wait().await {
            if let Some(request) = self.last_request() {
                let atoms = {
                    let mut cursor = self.cursor.lock();
                    self.store
                        .get_status_update(&mut cursor, request.start, request.end)
                };
                self.stats.diffs.fetch_add(1, Ordering::Relaxed);
                trace!(
                    topic = %self.topic,
                    start = request.start,
                    end = request.end,
                    atoms = atoms.len(),
                    "Computed diff"
                );

                for atom in &atoms {
                    if self.outbound.send(encode_diff(self.topic, atom)).await.is_err() {
                        debug!(topic = %self.topic, "Outbound queue closed, stopping diff loop");
                        return;
                    }
                    self.stats.frames.fetch_add(1, Ordering::Relaxed);
                }
            }
            tokio::time::sleep(self.config.debounce).await;
        }
        debug!(topic = %self.topic, "Diff loop finished");
    }

    /// Coalescing loop.
    pub async fn pushes_to_requests(self: Arc<Self>, mut pushes: TriggerReceiver) {
        let batch_limit = self.config.trigger_queue_capacity.max(1);
        // item read while idle, checked with the next batch
        let mut carried: Option<QueueRecv> = None;
        let mut stop = false;

        loop {
            let mut hit = false;
            if let Some(item) = carried.take() {
                self.absorb(item, &mut hit, &mut stop);
            }
            for _ in 0..batch_limit {
                if stop {
                    break;
                }
                match pushes.try_recv() {
                    QueueRecv::Empty => break,
                    item => self.absorb(item, &mut hit, &mut stop),
                }
            }

            if hit {
                if self.pending.raise() {
                    trace!(topic = %self.topic, "Diff scheduled");
                }
                if stop {
                    break;
                }
                continue;
            }
            if stop {
                break;
            }

            let item = pushes.recv().await;
            if item != QueueRecv::Closed {
                tokio::time::sleep(self.config.batch_interval).await;
            }
            carried = Some(item);
        }

        self.pending.close();
        debug!(topic = %self.topic, "Coalescing loop finished");
    }

    fn absorb(&self, item: QueueRecv, hit: &mut bool, stop: &mut bool) {
        match item {
            QueueRecv::Trigger(index) => {
                if self.check_window_hit(index) {
                    *hit = true;
                }
            }
            QueueRecv::Lagged(missed) => {
                // a lost trigger may have been relevant
                self.stats.lagged.fetch_add(missed, Ordering::Relaxed);
                debug!(topic = %self.topic, missed, "Trigger queue overflowed");
                *hit = true;
            }
            QueueRecv::Closed => *stop = true,
            QueueRecv::Empty => {}
        }
    }

    /// Whether `index` is inside the interest window. The first trigger seen
    /// before any status frame opens a default window at its index.
    fn check_window_hit(&self, index: Index) -> bool {
        let mut last = self.last_request.lock();
        let request =
            last.get_or_insert_with(|| DataRequest::starting_at(index, self.config.window_size));
        request.contains(index)
    }
}
