//! # Server State
//!
//! The stores, one per topic, and the event pipe that feeds them. Every box
//! a data source produces goes through [`ServerState::pipe_events`]: inserted
//! into its topic's store, then announced on the hub.

use bytes::Bytes;
use cw_01_window_store::{AddOutcome, WindowDag};
use cw_02_diff_sync::{ClientState, RequestHandler, SyncConfig};
use parking_lot::Mutex;
use serde::Serialize;
use shared_bus::{Hub, HubStats};
use shared_types::{short_hex, DataEvent, Index, Topic, Trigger};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the shared event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Per-topic store summary.
#[derive(Debug, Clone, Serialize)]
pub struct TopicStats {
    pub max_index: Index,
    pub capacity: Index,
    pub keys: usize,
    pub floating: usize,
}

/// What `/stats` reports.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    /// Counts every status frame must carry.
    pub window_size: usize,
    pub hub: HubStats,
    pub connections: u64,
    pub frames_sent: u64,
    pub inserted: u64,
    pub topics: BTreeMap<String, TopicStats>,
}

pub struct ServerState {
    hub: Arc<Hub>,
    dags: HashMap<Topic, Arc<WindowDag>>,
    sync: SyncConfig,
    events_tx: Mutex<Option<mpsc::Sender<DataEvent>>>,
    events_rx: Mutex<Option<mpsc::Receiver<DataEvent>>>,
    connections: AtomicU64,
    frames_sent: AtomicU64,
    inserted: AtomicU64,
}

impl ServerState {
    pub fn new(hub: Arc<Hub>, sync: SyncConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            hub,
            dags: HashMap::new(),
            sync,
            events_tx: Mutex::new(Some(events_tx)),
            events_rx: Mutex::new(Some(events_rx)),
            connections: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            inserted: AtomicU64::new(0),
        }
    }

    /// Attaches the store serving `topic`.
    pub fn set_dag(&mut self, topic: Topic, dag: Arc<WindowDag>) {
        self.dags.insert(topic, dag);
    }

    pub fn dag(&self, topic: Topic) -> Option<&Arc<WindowDag>> {
        self.dags.get(&topic)
    }

    pub fn dags(&self) -> impl Iterator<Item = (&Topic, &Arc<WindowDag>)> {
        self.dags.iter()
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn sync_config(&self) -> &SyncConfig {
        &self.sync
    }

    /// Where data sources send their boxes. `None` after
    /// [`ServerState::close_events`].
    pub fn event_sender(&self) -> Option<mpsc::Sender<DataEvent>> {
        self.events_tx.lock().clone()
    }

    /// Drops the state's own sender. The pipe stops once every source has
    /// dropped theirs too.
    pub fn close_events(&self) {
        self.events_tx.lock().take();
    }

    /// Builds the state for a new viewer: one request handler per topic,
    /// all writing to `outbound`.
    pub fn new_client_state(&self, outbound: mpsc::Sender<Bytes>) -> ClientState {
        self.connections.fetch_add(1, Ordering::Relaxed);
        let mut client = ClientState::new(self.sync.window_size);
        for (topic, dag) in &self.dags {
            let (handler, pushes) = RequestHandler::new(
                *topic,
                Arc::clone(dag) as _,
                outbound.clone(),
                self.sync.clone(),
            );
            client.add_handler(handler, pushes);
        }
        client
    }

    pub(crate) fn record_frames(&self, n: u64) {
        self.frames_sent.fetch_add(n, Ordering::Relaxed);
    }

    /// Inserts one event and publishes its trigger. Returns whether the box
    /// was inserted.
    pub fn apply_event(&self, event: DataEvent) -> bool {
        let Some(dag) = self.dags.get(&event.topic) else {
            warn!(topic = %event.topic, "Cannot pipe event, unrecognized topic");
            return false;
        };
        let index = event.dag_box.index;
        let key = event.dag_box.key;
        match dag.add_box(event.dag_box) {
            Ok(AddOutcome::Inserted { depth }) => {
                self.inserted.fetch_add(1, Ordering::Relaxed);
                debug!(topic = %event.topic, index, depth, key = %short_hex(&key), "Box inserted");
                self.hub.publish(Trigger {
                    topic: event.topic,
                    index,
                });
                true
            }
            Ok(outcome) => {
                debug!(topic = %event.topic, index, ?outcome, "Box not inserted");
                false
            }
            Err(e) => {
                warn!(topic = %event.topic, index, error = %e, "Rejected box");
                false
            }
        }
    }

    /// Drains the event channel until every sender is gone. Only the first
    /// call does anything.
    pub async fn pipe_events(self: Arc<Self>) {
        let Some(mut events) = self.events_rx.lock().take() else {
            warn!("Event pipe already running");
            return;
        };
        info!(topics = self.dags.len(), "Event pipe started");
        while let Some(event) = events.recv().await {
            self.apply_event(event);
        }
        info!("Event pipe stopped");
    }

    pub fn stats(&self) -> ServerStats {
        let topics = self
            .dags
            .iter()
            .map(|(topic, dag)| {
                (
                    topic.to_string(),
                    TopicStats {
                        max_index: dag.max_index(),
                        capacity: dag.capacity(),
                        keys: dag.key_count(),
                        floating: dag.floating_count(),
                    },
                )
            })
            .collect();
        ServerStats {
            window_size: self.sync.window_size,
            hub: self.hub.stats(),
            connections: self.connections.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            topics,
        }
    }
}
