//! A node of the window graph.

use parking_lot::RwLock;
use shared_types::{DagBox, Hash, Index};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// An inserted box plus its parent linkage.
///
/// The store owns every node through its layer. The parent link is a `Weak`
/// used for navigation only; it never keeps a parent alive. Eviction clears
/// the liveness flag, and every traversal checks it, so a child of an evicted
/// node observes `None` rather than the evicted parent.
pub struct DagNode {
    inner: DagBox,
    parent: RwLock<Option<Weak<DagNode>>>,
    alive: AtomicBool,
}

impl DagNode {
    /// Wraps a box in a fresh, unlinked, live node.
    pub fn new(inner: DagBox) -> Arc<Self> {
        Arc::new(Self {
            inner,
            parent: RwLock::new(None),
            alive: AtomicBool::new(true),
        })
    }

    pub fn dag_box(&self) -> &DagBox {
        &self.inner
    }

    pub fn index(&self) -> Index {
        self.inner.index
    }

    pub fn key(&self) -> &Hash {
        &self.inner.key
    }

    pub fn parent_key(&self) -> &Hash {
        &self.inner.parent_key
    }

    /// Whether the node's layer is still retained.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// The live parent, if linked and not evicted.
    pub fn parent(&self) -> Option<Arc<DagNode>> {
        if !self.is_alive() {
            return None;
        }
        let parent = self.parent.read().as_ref()?.upgrade()?;
        parent.is_alive().then_some(parent)
    }

    /// Whether a parent link was ever resolved and not yet severed.
    pub fn has_parent_link(&self) -> bool {
        self.parent.read().is_some()
    }

    /// Walks the live parent chain, starting at this node's parent.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.parent(),
        }
    }

    pub(crate) fn link_parent(&self, parent: &Arc<DagNode>) {
        *self.parent.write() = Some(Arc::downgrade(parent));
    }

    /// Severs the node from the live graph.
    pub(crate) fn kill(&self) {
        self.alive.store(false, Ordering::Release);
        *self.parent.write() = None;
    }
}

impl fmt::Debug for DagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DagNode")
            .field("index", &self.inner.index)
            .field("key", &shared_types::short_hex(&self.inner.key))
            .field("parent_key", &shared_types::short_hex(&self.inner.parent_key))
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Iterator over the live ancestors of a node, nearest first.
pub struct Ancestors {
    next: Option<Arc<DagNode>>,
}

impl Iterator for Ancestors {
    type Item = Arc<DagNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}
