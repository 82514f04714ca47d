//! Cross-crate integration tests.

pub mod flows;
pub mod websocket;

use cw_01_window_store::WindowDag;
use cw_02_diff_sync::SyncConfig;
use cw_03_viewer_gateway::ServerState;
use shared_bus::Hub;
use shared_types::{DagBox, DataEvent, Hash, Index, Topic, ZERO_HASH};
use std::sync::Arc;
use std::time::Duration;

/// Key whose first byte is `tag`, so parents are easy to name in tests.
pub fn key(tag: u8) -> Hash {
    let mut k = [0x5a; 32];
    k[0] = tag;
    k
}

/// A block box with a one-byte payload equal to its tag.
pub fn block(index: Index, tag: u8, parent: Option<u8>) -> DataEvent {
    let parent_key = parent.map(key).unwrap_or(ZERO_HASH);
    DataEvent::new(
        Topic::BLOCKS,
        DagBox::with_bytes(index, key(tag), parent_key, vec![tag]),
    )
}

/// Sync settings with short timers.
pub fn fast_sync(window_size: usize) -> SyncConfig {
    SyncConfig {
        window_size,
        debounce: Duration::from_millis(5),
        batch_interval: Duration::from_millis(5),
        ..SyncConfig::default()
    }
}

/// Server state serving one block store.
pub fn server(capacity: Index, sync: SyncConfig) -> (Arc<ServerState>, Arc<WindowDag>) {
    let dag = Arc::new(WindowDag::new(capacity).expect("non-zero capacity"));
    let mut server = ServerState::new(Arc::new(Hub::new()), sync);
    server.set_dag(Topic::BLOCKS, Arc::clone(&dag));
    (Arc::new(server), dag)
}
