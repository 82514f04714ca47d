//! Insertion invariants for the window store.

use crate::errors::DagError;
use shared_types::{short_hex, DagBox, Index};

/// INVARIANT-1: No Self-Parenting
/// A box never names itself as its parent.
pub fn invariant_not_self_parented(b: &DagBox) -> bool {
    !b.is_self_parented()
}

/// INVARIANT-2: Layer Membership
/// Every node in a layer carries the layer's index.
pub fn invariant_layer_index(node_index: Index, layer_index: Index) -> bool {
    node_index == layer_index
}

/// INVARIANT-3: Window Bound
/// A box is only worth inserting if its index is still inside the window
/// ending at `max_index`.
pub fn invariant_within_window(index: Index, capacity: Index, max_index: Index) -> bool {
    index.saturating_add(capacity) > max_index
}

/// Check the invariants a box must satisfy before any store state is touched.
pub fn check_insert(b: &DagBox) -> Result<(), DagError> {
    if !invariant_not_self_parented(b) {
        return Err(DagError::SelfParent {
            key: short_hex(&b.key),
        });
    }
    Ok(())
}
