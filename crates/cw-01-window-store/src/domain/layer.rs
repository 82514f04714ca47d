//! Append-only collection of the nodes sharing one index.

use super::invariants::invariant_layer_index;
use super::node::DagNode;
use crate::errors::DagError;
use parking_lot::RwLock;
use shared_types::{Hash, Index};
use std::sync::Arc;

/// All nodes of one index, in arrival order.
///
/// Nodes are only ever appended. A node's position ("depth") never changes,
/// so readers holding an older count still see valid entries. The whole layer
/// is discarded at once when it leaves the window.
#[derive(Debug)]
pub struct DagLayer {
    index: Index,
    nodes: RwLock<Vec<Arc<DagNode>>>,
}

impl DagLayer {
    pub fn new(index: Index) -> Self {
        Self {
            index,
            nodes: RwLock::new(Vec::new()),
        }
    }

    pub fn index(&self) -> Index {
        self.index
    }

    /// Appends a node and returns its depth.
    pub fn add_node(&self, node: Arc<DagNode>) -> Result<u32, DagError> {
        if !invariant_layer_index(node.index(), self.index) {
            return Err(DagError::IndexMismatch {
                node: node.index(),
                layer: self.index,
            });
        }
        let mut nodes = self.nodes.write();
        let depth = nodes.len() as u32;
        nodes.push(node);
        Ok(depth)
    }

    /// Finds a node by key. Linear in the layer width.
    pub fn get_node(&self, key: &Hash) -> Option<Arc<DagNode>> {
        self.nodes.read().iter().find(|n| n.key() == key).cloned()
    }

    pub fn get_node_at_depth(&self, depth: u32) -> Option<Arc<DagNode>> {
        self.nodes.read().get(depth as usize).cloned()
    }

    /// Number of nodes appended so far.
    pub fn get_node_depth(&self) -> u32 {
        self.nodes.read().len() as u32
    }

    /// Current count, plus the nodes at depth `from` and beyond.
    pub fn nodes_from(&self, from: u32) -> (u32, Vec<Arc<DagNode>>) {
        let nodes = self.nodes.read();
        let count = nodes.len() as u32;
        let tail = nodes
            .get(from as usize..)
            .map(<[Arc<DagNode>]>::to_vec)
            .unwrap_or_default();
        (count, tail)
    }

    /// Severs every node of the layer from the live graph.
    pub(crate) fn kill(&self) {
        for node in self.nodes.read().iter() {
            node.kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{DagBox, ZERO_HASH};

    fn node(index: Index, key: u8) -> Arc<DagNode> {
        DagNode::new(DagBox::with_bytes(index, [key; 32], ZERO_HASH, vec![key]))
    }

    #[test]
    fn test_add_node_returns_depth() {
        let layer = DagLayer::new(5);
        assert_eq!(layer.add_node(node(5, 1)).unwrap(), 0);
        assert_eq!(layer.add_node(node(5, 2)).unwrap(), 1);
        assert_eq!(layer.get_node_depth(), 2);
        assert_eq!(layer.get_node_at_depth(1).unwrap().key(), &[2u8; 32]);
        assert!(layer.get_node_at_depth(2).is_none());
    }

    #[test]
    fn test_add_node_index_mismatch() {
        let layer = DagLayer::new(5);
        let err = layer.add_node(node(6, 1)).unwrap_err();
        assert_eq!(err, DagError::IndexMismatch { node: 6, layer: 5 });
        assert_eq!(layer.get_node_depth(), 0);
    }

    #[test]
    fn test_get_node_by_key() {
        let layer = DagLayer::new(1);
        layer.add_node(node(1, 1)).unwrap();
        layer.add_node(node(1, 2)).unwrap();
        assert!(layer.get_node(&[2u8; 32]).is_some());
        assert!(layer.get_node(&[3u8; 32]).is_none());
    }

    #[test]
    fn test_nodes_from() {
        let layer = DagLayer::new(1);
        for k in 1..=4 {
            layer.add_node(node(1, k)).unwrap();
        }
        let (count, tail) = layer.nodes_from(2);
        assert_eq!(count, 4);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].key(), &[3u8; 32]);

        let (count, tail) = layer.nodes_from(9);
        assert_eq!(count, 4);
        assert!(tail.is_empty());
    }

    #[test]
    fn test_kill_layer() {
        let layer = DagLayer::new(1);
        layer.add_node(node(1, 1)).unwrap();
        layer.add_node(node(1, 2)).unwrap();
        layer.kill();
        assert!(!layer.get_node_at_depth(0).unwrap().is_alive());
        assert!(!layer.get_node_at_depth(1).unwrap().is_alive());
    }
}
