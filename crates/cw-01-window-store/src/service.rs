//! # Window Store Service
//!
//! The "DAG": a directed tree of recent nodes with floating components that
//! get connected once their parent arrives.
//!
//! ## Locking
//!
//! A single `parking_lot::Mutex` guards the ring's layer table, the floating
//! map and the key index. It is held for pointer bookkeeping only. Diff
//! computation copies the layer table under the lock and reads layers after
//! releasing it. GC severs evicted nodes after releasing it, one rayon task
//! per evicted layer, joined before `gc` returns.

use crate::domain::{check_insert, compute_diff, DagLayer, DagNode, DiffAtom, LatestLayers};
use crate::domain::{Snapshot, StatusCursor};
use crate::errors::DagError;
use crate::ports::inbound::WindowStoreApi;
use parking_lot::Mutex;
use rayon::prelude::*;
use shared_types::{short_hex, DagBox, Hash, Index};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The node was appended at `depth` within its layer.
    Inserted { depth: u32 },
    /// The box was too old for the window and was dropped.
    Stale,
    /// A node with this key is already in the window.
    Duplicate,
}

impl AddOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, AddOutcome::Inserted { .. })
    }
}

/// What a GC pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub evicted_layers: usize,
    pub evicted_nodes: usize,
    pub pruned_keys: usize,
    pub pruned_orphans: usize,
}

struct DagState {
    // parent-key -> child key -> child, for children whose parent has not arrived
    floating: HashMap<Hash, HashMap<Hash, Arc<DagNode>>>,
    // key -> index, for every node in the window
    indices: HashMap<Hash, Index>,
    layers: LatestLayers,
    // layers pushed out of their slot by a newer index, severed on the next GC
    retired: Vec<Arc<DagLayer>>,
}

/// Sliding-window store of the latest `capacity` layers.
pub struct WindowDag {
    capacity: Index,
    state: Mutex<DagState>,
}

impl WindowDag {
    pub fn new(capacity: Index) -> Result<Self, DagError> {
        if capacity == 0 {
            return Err(DagError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            state: Mutex::new(DagState {
                floating: HashMap::new(),
                indices: HashMap::new(),
                layers: LatestLayers::new(capacity),
                retired: Vec::new(),
            }),
        })
    }

    pub fn capacity(&self) -> Index {
        self.capacity
    }

    pub fn add_box(&self, b: DagBox) -> Result<AddOutcome, DagError> {
        check_insert(&b)?;

        let mut guard = self.state.lock();
        let DagState {
            floating,
            indices,
            layers,
            retired,
        } = &mut *guard;

        if b.index.saturating_add(self.capacity) <= layers.max() {
            trace!(index = b.index, max = layers.max(), "Dropping box older than window");
            return Ok(AddOutcome::Stale);
        }
        if indices.contains_key(&b.key) {
            trace!(index = b.index, key = %short_hex(&b.key), "Dropping duplicate box");
            return Ok(AddOutcome::Duplicate);
        }

        let parent = indices
            .get(&b.parent_key)
            .and_then(|i| layers.get(*i))
            .and_then(|layer| layer.get_node(&b.parent_key));

        let target = match layers.get(b.index) {
            Some(layer) => layer,
            None => {
                let layer = Arc::new(DagLayer::new(b.index));
                if let Some(displaced) = layers.put(Arc::clone(&layer)) {
                    retired.push(displaced);
                }
                layer
            }
        };

        let (index, key, parent_key) = (b.index, b.key, b.parent_key);
        let node = DagNode::new(b);
        let depth = target.add_node(Arc::clone(&node))?;

        match parent {
            Some(p) => node.link_parent(&p),
            None => {
                // parent may still arrive within the window
                floating
                    .entry(parent_key)
                    .or_default()
                    .insert(key, Arc::clone(&node));
            }
        }

        if let Some(children) = floating.remove(&key) {
            for child in children.values() {
                child.link_parent(&node);
            }
            trace!(key = %short_hex(&key), adopted = children.len(), "Resolved floating children");
        }

        indices.insert(key, index);
        Ok(AddOutcome::Inserted { depth })
    }

    pub fn get_snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot::new(state.layers.max(), state.layers.layers())
    }

    /// Note: the cursor is advanced in place.
    pub fn get_status_update(
        &self,
        cursor: &mut StatusCursor,
        start: Index,
        end: Index,
    ) -> Vec<DiffAtom> {
        let snapshot = self.get_snapshot();
        compute_diff(&snapshot, cursor, start, end)
    }

    pub fn gc(&self) -> GcReport {
        let (evicted, pruned_keys, pruned_orphans) = {
            let mut guard = self.state.lock();
            let DagState {
                floating,
                indices,
                layers,
                retired,
            } = &mut *guard;

            let mut evicted = layers.evict_expired();
            evicted.append(retired);

            let (capacity, max) = (self.capacity, layers.max());
            let expired = |i: Index| i.saturating_add(capacity) <= max;

            let before = indices.len();
            indices.retain(|key, i| {
                if expired(*i) {
                    floating.remove(key);
                    false
                } else {
                    true
                }
            });
            let pruned_keys = before - indices.len();

            let mut pruned_orphans = 0;
            floating.retain(|_, children| {
                let before = children.len();
                children.retain(|_, child| !expired(child.index()));
                pruned_orphans += before - children.len();
                !children.is_empty()
            });

            (evicted, pruned_keys, pruned_orphans)
        };

        let evicted_nodes = evicted
            .par_iter()
            .map(|layer| {
                layer.kill();
                layer.get_node_depth() as usize
            })
            .sum();

        let report = GcReport {
            evicted_layers: evicted.len(),
            evicted_nodes,
            pruned_keys,
            pruned_orphans,
        };
        if report.evicted_layers > 0 {
            debug!(
                evicted_layers = report.evicted_layers,
                evicted_nodes = report.evicted_nodes,
                pruned_keys = report.pruned_keys,
                "Evicted layers outside window"
            );
        }
        report
    }

    pub fn max_index(&self) -> Index {
        self.state.lock().layers.max()
    }

    /// Looks a node up by key, if it is still in the window.
    pub fn get_node(&self, key: &Hash) -> Option<Arc<DagNode>> {
        let state = self.state.lock();
        let index = state.indices.get(key)?;
        state.layers.get(*index)?.get_node(key)
    }

    /// Number of nodes still waiting for their parent.
    pub fn floating_count(&self) -> usize {
        self.state.lock().floating.values().map(HashMap::len).sum()
    }

    /// Number of keys recorded in the index map.
    pub fn key_count(&self) -> usize {
        self.state.lock().indices.len()
    }

    pub fn empty_status(&self, window_size: usize) -> StatusCursor {
        StatusCursor::new(window_size)
    }
}

impl WindowStoreApi for WindowDag {
    fn add_box(&self, b: DagBox) -> Result<AddOutcome, DagError> {
        WindowDag::add_box(self, b)
    }

    fn get_snapshot(&self) -> Snapshot {
        WindowDag::get_snapshot(self)
    }

    fn get_status_update(
        &self,
        cursor: &mut StatusCursor,
        start: Index,
        end: Index,
    ) -> Vec<DiffAtom> {
        WindowDag::get_status_update(self, cursor, start, end)
    }

    fn gc(&self) -> GcReport {
        WindowDag::gc(self)
    }

    fn max_index(&self) -> Index {
        WindowDag::max_index(self)
    }
}
