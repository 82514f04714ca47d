//! # Trigger Queue
//!
//! Bounded, single-consumer queue of trigger indices. Built on
//! `tokio::sync::broadcast` with exactly one receiver: a full queue
//! overwrites its oldest entry instead of blocking the producer, and the
//! receiver learns how many entries it missed.

use parking_lot::Mutex;
use shared_types::Index;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Outcome of reading from a [`TriggerReceiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRecv {
    /// The next trigger index.
    Trigger(Index),
    /// The producer overwrote this many triggers before they were read.
    Lagged(u64),
    /// Nothing queued right now (only from `try_recv`).
    Empty,
    /// The queue was closed and fully drained.
    Closed,
}

/// Producer side. Closing it is the termination signal for the consumer.
#[derive(Debug)]
pub struct TriggerQueue {
    sender: Mutex<Option<broadcast::Sender<Index>>>,
    capacity: usize,
}

/// Consumer side.
#[derive(Debug)]
pub struct TriggerReceiver {
    receiver: broadcast::Receiver<Index>,
}

/// Creates a queue holding at most `capacity` pending triggers, rounded up
/// to a power of two.
pub fn trigger_queue(capacity: usize) -> (TriggerQueue, TriggerReceiver) {
    let capacity = capacity.max(1).next_power_of_two();
    let (sender, receiver) = broadcast::channel(capacity);
    (
        TriggerQueue {
            sender: Mutex::new(Some(sender)),
            capacity,
        },
        TriggerReceiver { receiver },
    )
}

impl TriggerQueue {
    /// Queues `index`. Never blocks. Returns false once the queue is closed
    /// or its receiver is gone.
    pub fn push(&self, index: Index) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(index).is_ok(),
            None => false,
        }
    }

    /// Closes the queue. The receiver still sees every entry queued before.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl TriggerReceiver {
    /// Waits for the next entry. Never returns [`QueueRecv::Empty`].
    pub async fn recv(&mut self) -> QueueRecv {
        match self.receiver.recv().await {
            Ok(index) => QueueRecv::Trigger(index),
            Err(RecvError::Lagged(missed)) => QueueRecv::Lagged(missed),
            Err(RecvError::Closed) => QueueRecv::Closed,
        }
    }

    /// Reads the next entry if one is queued.
    pub fn try_recv(&mut self) -> QueueRecv {
        match self.receiver.try_recv() {
            Ok(index) => QueueRecv::Trigger(index),
            Err(TryRecvError::Lagged(missed)) => QueueRecv::Lagged(missed),
            Err(TryRecvError::Empty) => QueueRecv::Empty,
            Err(TryRecvError::Closed) => QueueRecv::Closed,
        }
    }
}
