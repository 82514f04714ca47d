//! Per-viewer topic routing.

use crate::errors::SyncError;
use crate::service::{HandlerCounters, RequestHandler};
use crate::wire::parse_status;
use bytes::Buf;
use parking_lot::Mutex;
use shared_bus::{TriggerReceiver, TriggerSink};
use shared_types::{Topic, Trigger};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Everything the server keeps for one connected viewer: a request handler
/// per topic it can serve.
pub struct ClientState {
    handlers: HashMap<Topic, Arc<RequestHandler>>,
    // receivers not yet handed to a coalescing loop
    idle: Mutex<Vec<(Arc<RequestHandler>, TriggerReceiver)>>,
    window_size: usize,
}

impl ClientState {
    pub fn new(window_size: usize) -> Self {
        Self {
            handlers: HashMap::new(),
            idle: Mutex::new(Vec::new()),
            window_size,
        }
    }

    /// Routes the handler's topic to it. A second handler for the same
    /// topic replaces the first.
    pub fn add_handler(&mut self, handler: Arc<RequestHandler>, pushes: TriggerReceiver) {
        self.handlers.insert(handler.topic(), Arc::clone(&handler));
        self.idle.get_mut().push((handler, pushes));
    }

    pub fn handler(&self, topic: Topic) -> Option<&Arc<RequestHandler>> {
        self.handlers.get(&topic)
    }

    /// Spawns the diff and coalescing loops of every handler. Calling it
    /// again spawns nothing.
    pub fn handle_events(&self) -> Vec<JoinHandle<()>> {
        let idle = std::mem::take(&mut *self.idle.lock());
        let mut tasks = Vec::with_capacity(idle.len() * 2);
        for (handler, pushes) in idle {
            tasks.push(tokio::spawn(Arc::clone(&handler).handle_requests()));
            tasks.push(tokio::spawn(handler.pushes_to_requests(pushes)));
        }
        tasks
    }

    /// Handles one inbound status frame. Returns the topic it was for.
    pub fn on_message(&self, frame: &[u8]) -> Result<Topic, SyncError> {
        let msg = parse_status(frame, self.window_size)?;
        let handler = self
            .handlers
            .get(&msg.topic)
            .ok_or(SyncError::UnknownTopic(msg.topic))?;
        handler.on_status(&msg)?;
        debug!(topic = %msg.topic, start = msg.start, end = msg.end(), "Status received");
        Ok(msg.topic)
    }

    /// Sum of every handler's counters.
    pub fn counters(&self) -> HandlerCounters {
        self.handlers
            .values()
            .map(|h| h.counters())
            .fold(HandlerCounters::default(), |acc, c| HandlerCounters {
                diffs: acc.diffs + c.diffs,
                frames: acc.frames + c.frames,
                lagged: acc.lagged + c.lagged,
                signals: acc.signals + c.signals,
            })
    }
}

impl TriggerSink for ClientState {
    fn trigger(&self, trigger: Trigger) -> bool {
        match self.handlers.get(&trigger.topic) {
            Some(handler) => handler.push(trigger.index),
            None => {
                warn!(topic = %trigger.topic, index = trigger.index, "Unhandled trigger");
                false
            }
        }
    }

    fn close(&self) {
        for handler in self.handlers.values() {
            handler.close();
        }
    }
}

/// Reads the topic of a frame without parsing the rest.
pub fn peek_topic(frame: &[u8]) -> Option<Topic> {
    (frame.len() >= 4).then(|| Topic((&frame[..4]).get_u32_le()))
}
