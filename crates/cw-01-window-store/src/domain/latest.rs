//! Fixed-capacity ring of the latest layers.

use super::invariants::invariant_within_window;
use super::layer::DagLayer;
use shared_types::Index;
use std::sync::Arc;

/// Ring of layers keyed by `index % capacity`.
///
/// A slot only answers for index `i` when `max - capacity < i <= max` and
/// the stored layer still reports `i`; anything else is garbage from an
/// earlier cycle. Not synchronized on its own: the window store keeps it
/// behind its lock and never hands out slot access.
#[derive(Debug)]
pub struct LatestLayers {
    layers: Vec<Option<Arc<DagLayer>>>,
    // final, doesn't change
    length: Index,
    max: Index,
}

impl LatestLayers {
    /// `length` must be non-zero; the window store checks this.
    pub fn new(length: Index) -> Self {
        Self {
            layers: vec![None; length as usize],
            length,
            max: 0,
        }
    }

    pub fn length(&self) -> Index {
        self.length
    }

    /// Highest index ever put.
    pub fn max(&self) -> Index {
        self.max
    }

    /// Lowest index the window could still hold (exclusive when non-zero).
    pub fn floor(&self) -> Index {
        self.max.saturating_sub(self.length)
    }

    fn slot(&self, i: Index) -> usize {
        (i % self.length) as usize
    }

    /// Whether index `i` lies inside the current window.
    pub fn retains(&self, i: Index) -> bool {
        i <= self.max && invariant_within_window(i, self.length, self.max)
    }

    /// Installs a layer and returns the layer it displaced from its slot.
    pub fn put(&mut self, layer: Arc<DagLayer>) -> Option<Arc<DagLayer>> {
        let i = layer.index();
        let slot = self.slot(i);
        let displaced = self.layers[slot].replace(layer);
        if i > self.max {
            self.max = i;
        }
        displaced
    }

    /// The live layer for index `i`, rejecting stale slot reuse.
    pub fn get(&self, i: Index) -> Option<Arc<DagLayer>> {
        if !self.retains(i) {
            return None;
        }
        self.layers[self.slot(i)]
            .as_ref()
            .filter(|layer| layer.index() == i)
            .cloned()
    }

    /// Shallow copy of the layer table.
    pub fn layers(&self) -> Vec<Option<Arc<DagLayer>>> {
        self.layers.clone()
    }

    /// Nulls every slot whose layer fell out of the window and returns the
    /// evicted layers.
    pub fn evict_expired(&mut self) -> Vec<Arc<DagLayer>> {
        let (length, max) = (self.length, self.max);
        let mut evicted = Vec::new();
        for slot in self.layers.iter_mut() {
            let expired = slot
                .as_ref()
                .is_some_and(|layer| !invariant_within_window(layer.index(), length, max));
            if expired {
                if let Some(layer) = slot.take() {
                    evicted.push(layer);
                }
            }
        }
        evicted
    }
}
