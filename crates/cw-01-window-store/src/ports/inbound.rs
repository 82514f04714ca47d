//! Inbound ports (API) for the window store.

use crate::domain::{DiffAtom, Snapshot, StatusCursor};
use crate::errors::DagError;
use crate::service::{AddOutcome, GcReport};
use shared_types::{DagBox, Index};

/// Primary API of the window store.
///
/// Safe to call concurrently from any number of producers and viewers.
pub trait WindowStoreApi: Send + Sync {
    /// Insert a box.
    ///
    /// Boxes older than the window are dropped (`AddOutcome::Stale`). A
    /// self-parenting box is rejected with `DagError::SelfParent` and leaves
    /// the store untouched.
    fn add_box(&self, b: DagBox) -> Result<AddOutcome, DagError>;

    /// The highest index and a shallow copy of the layer table.
    fn get_snapshot(&self) -> Snapshot;

    /// Diff `start..end` against a fresh snapshot, advancing `cursor`.
    fn get_status_update(&self, cursor: &mut StatusCursor, start: Index, end: Index)
        -> Vec<DiffAtom>;

    /// Evict layers that fell out of the window.
    fn gc(&self) -> GcReport;

    /// Highest index ever inserted.
    fn max_index(&self) -> Index;

    /// A cursor that has seen nothing.
    fn empty_status(&self, window_size: usize) -> StatusCursor {
        StatusCursor::new(window_size)
    }
}
