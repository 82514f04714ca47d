//! Random parent-linked boxes for demos and local testing.

use super::DataSource;
use async_trait::async_trait;
use cw_01_window_store::{DagNode, WindowDag};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{short_hex, DagBox, DataEvent, Hash, Payload, Topic, ZERO_HASH};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Constant payload of every mock box.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockBlock;

impl Payload for MockBlock {
    fn encode(&self) -> Vec<u8> {
        b"foobar".to_vec()
    }
}

/// Grows a random forest on top of whatever the store currently holds.
///
/// Each new box picks a random node of the newest non-empty layer, sometimes
/// climbs to one of its ancestors, and lands 0 to 2 indices above it. Boxes
/// at the same index as their parent are allowed and widen that layer.
pub struct MockSource {
    dag: Arc<WindowDag>,
    topic: Topic,
    interval: Duration,
}

impl MockSource {
    pub fn new(dag: Arc<WindowDag>, topic: Topic, interval: Duration) -> Self {
        Self {
            dag,
            topic,
            interval,
        }
    }

    /// Builds the next box from the store's current contents.
    pub fn next_box<R: Rng>(&self, rng: &mut R) -> DagBox {
        let mut node = self.pick_newest(rng);

        while let Some(current) = node.as_ref() {
            if rng.gen_range(0..10) <= 7 {
                break;
            }
            match current.parent() {
                Some(parent) => node = Some(parent),
                None => break,
            }
        }

        let (index, parent_key) = match node {
            Some(n) => (n.index() + rng.gen_range(0..3), *n.key()),
            None => (0, ZERO_HASH),
        };

        let mut key: Hash = rng.gen();
        while key == parent_key {
            key = rng.gen();
        }
        DagBox::new(index, key, parent_key, Arc::new(MockBlock))
    }

    /// A random node of the highest layer that has any.
    fn pick_newest<R: Rng>(&self, rng: &mut R) -> Option<Arc<DagNode>> {
        let snapshot = self.dag.get_snapshot();
        let floor = snapshot.floor();
        let mut i = snapshot.time();
        loop {
            if let Some(layer) = snapshot.layer_at(i) {
                let width = layer.get_node_depth();
                if width > 0 {
                    return layer.get_node_at_depth(rng.gen_range(0..width));
                }
            }
            if i == floor {
                return None;
            }
            i -= 1;
        }
    }
}

#[async_trait]
impl DataSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, events: mpsc::Sender<DataEvent>, mut shutdown: watch::Receiver<bool>) {
        info!(topic = %self.topic, interval_ms = self.interval.as_millis() as u64, "Mock source started");
        let mut rng = StdRng::from_entropy();
        loop {
            let b = self.next_box(&mut rng);
            debug!(
                index = b.index,
                key = %short_hex(&b.key),
                parent = %short_hex(&b.parent_key),
                "Mock box"
            );
            if events.send(DataEvent::new(self.topic, b)).await.is_err() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!(topic = %self.topic, "Mock source stopped");
    }
}
