//! # Domain Layer for the Window Store
//!
//! Pure data structures, no I/O.
//!
//! ## Contents
//!
//! - **node**: `DagNode` with its weak parent link and liveness flag
//! - **layer**: `DagLayer`, the append-only nodes of one index
//! - **latest**: `LatestLayers`, the fixed-capacity ring of layers
//! - **status**: `StatusCursor`, `Snapshot` and the diff algorithm
//! - **invariants**: insertion checks

mod invariants;
mod latest;
mod layer;
mod node;
mod status;

pub use invariants::*;
pub use latest::*;
pub use layer::*;
pub use node::*;
pub use status::*;
