//! Status cursors and the incremental diff.
//!
//! A viewer's cursor records, for each of the last `window_size` layers it
//! tracks, how many nodes of that layer it has already been sent. A diff
//! against a snapshot emits exactly the nodes past those counts and advances
//! the counts, so the work is proportional to the number of new nodes.
//!
//! ```text
//! cursor.time = 12, window_size = 4
//!
//! index  12  13  14  15
//! slot    0   1   2   3     counts[i % window_size]
//! sent    3   1   0   0
//! layer   4   1   2   0     -> atoms (12,3) (14,0) (14,1)
//! ```

use super::layer::DagLayer;
use super::node::DagNode;
use crate::errors::DagError;
use shared_types::Index;
use std::sync::Arc;
use tracing::trace;

/// One node a viewer has not seen yet.
#[derive(Debug, Clone)]
pub struct DiffAtom {
    /// Arrival position within the node's layer.
    pub depth: u32,
    /// The node; its layer index is `node.index()`.
    pub node: Arc<DagNode>,
}

impl DiffAtom {
    pub fn index(&self) -> Index {
        self.node.index()
    }
}

/// Point-in-time view of the store's layer table.
///
/// Layers are append-only, so reading them after the store lock is released
/// is safe; new layers installed later are simply not part of the view.
#[derive(Debug, Clone)]
pub struct Snapshot {
    time: Index,
    layers: Vec<Option<Arc<DagLayer>>>,
}

impl Snapshot {
    pub fn new(time: Index, layers: Vec<Option<Arc<DagLayer>>>) -> Self {
        Self { time, layers }
    }

    /// The store's highest index when the snapshot was taken.
    pub fn time(&self) -> Index {
        self.time
    }

    pub fn capacity(&self) -> Index {
        self.layers.len() as Index
    }

    /// Lowest index the store may still retain.
    pub fn floor(&self) -> Index {
        self.time.saturating_sub(self.capacity())
    }

    pub fn layers(&self) -> &[Option<Arc<DagLayer>>] {
        &self.layers
    }

    /// The layer for index `i`, if it is retained and the slot has not been
    /// reused by a newer index.
    pub fn layer_at(&self, i: Index) -> Option<&Arc<DagLayer>> {
        let capacity = self.capacity();
        if capacity == 0 || i > self.time || i.saturating_add(capacity) <= self.time {
            return None;
        }
        self.layers[(i % capacity) as usize]
            .as_ref()
            .filter(|layer| layer.index() == i)
    }
}

/// A viewer's diff progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCursor {
    time: Index,
    counts: Vec<u32>,
}

impl StatusCursor {
    /// An empty cursor: nothing sent yet.
    pub fn new(window_size: usize) -> Self {
        Self {
            time: 0,
            counts: vec![0; window_size.max(1)],
        }
    }

    /// First index the counts describe.
    pub fn time(&self) -> Index {
        self.time
    }

    pub fn window_size(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    fn slot(&self, i: Index) -> usize {
        (i % self.counts.len() as Index) as usize
    }

    /// Previously-sent count recorded for index `i`.
    pub fn count_at(&self, i: Index) -> u32 {
        self.counts[self.slot(i)]
    }

    /// Overwrites the cursor with a viewer's self-reported status.
    ///
    /// `counts[k]` is the number of nodes the viewer holds for index `start + k`.
    pub fn update_status(&mut self, start: Index, counts: &[u32]) -> Result<(), DagError> {
        if counts.len() != self.counts.len() {
            return Err(DagError::WindowSizeMismatch {
                expected: self.counts.len(),
                got: counts.len(),
            });
        }
        self.time = start;
        for (k, count) in counts.iter().enumerate() {
            let slot = self.slot(start + k as Index);
            self.counts[slot] = *count;
        }
        Ok(())
    }

    /// Zeroes the slots of `lo..hi`. Past one full window every slot is hit.
    fn reset_range(&mut self, lo: Index, hi: Index) {
        if hi <= lo {
            return;
        }
        if hi - lo >= self.counts.len() as Index {
            self.counts.iter_mut().for_each(|c| *c = 0);
            return;
        }
        for i in lo..hi {
            let slot = self.slot(i);
            self.counts[slot] = 0;
        }
    }

    /// Forgets every requested index the cursor cannot faithfully describe.
    ///
    /// The cursor covers `time..time + window_size`; requested indices
    /// before or after that are assumed unknown to the viewer.
    fn reconcile(&mut self, start: Index, end: Index) {
        let window = self.counts.len() as Index;
        self.reset_range(start, self.time.min(end));
        self.reset_range(start.max(self.time.saturating_add(window)), end);
    }
}

/// Computes the diff for `start..end` and advances the cursor.
///
/// Returns atoms in ascending `(index, depth)` order. A request entirely
/// behind (`end < snapshot.time()`) or ahead of (`start > snapshot.time()`)
/// the snapshot yields nothing and leaves the cursor alone.
pub fn compute_diff(
    snapshot: &Snapshot,
    cursor: &mut StatusCursor,
    start: Index,
    end: Index,
) -> Vec<DiffAtom> {
    let snap_time = snapshot.time();
    if end < snap_time {
        trace!(start, end, snap_time, "Diff request is stale");
        return Vec::new();
    }
    if start > snap_time {
        trace!(start, end, snap_time, "Diff request is premature");
        return Vec::new();
    }

    let window = cursor.window_size() as Index;
    let end = end.min(start.saturating_add(window));
    cursor.reconcile(start, end);

    let from = start.max(snapshot.floor());
    let to = end.min(snap_time.saturating_add(1));

    let mut atoms = Vec::new();
    for i in from..to {
        let slot = cursor.slot(i);
        let Some(layer) = snapshot.layer_at(i) else {
            cursor.counts[slot] = 0;
            continue;
        };
        let prev = cursor.counts[slot];
        let (current, fresh) = layer.nodes_from(prev);
        atoms.extend(fresh.into_iter().enumerate().map(|(k, node)| DiffAtom {
            depth: prev + k as u32,
            node,
        }));
        cursor.counts[slot] = current;
    }
    cursor.time = start;
    atoms
}
