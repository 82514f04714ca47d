//! # Core Domain Entities
//!
//! ## Entities
//!
//! - [`DagBox`]: one inserted item (index, key, parent key, payload)
//! - [`Topic`]: 32-bit stream tag carried on every wire frame
//! - [`Trigger`]: "a node was added at this index" hint fanned out to viewers
//! - [`Payload`]: encoding hook for the opaque box value
//! - [`DataEvent`]: a box on its way from a data source to a store

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Monotonic sequence number of a layer (e.g. a slot height).
pub type Index = u64;

/// A 32-byte key (block root, parent root).
pub type Hash = [u8; 32];

/// The all-zero key, used as the parent of a genesis box.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Short hex form of a key for log fields.
pub fn short_hex(key: &Hash) -> String {
    hex::encode(&key[..4])
}

/// Stream tag. Every wire frame starts with one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Topic(pub u32);

impl Topic {
    /// Unrouted traffic.
    pub const DEFAULT: Topic = Topic(0);
    /// Chain blocks, the topic backed by a window store.
    pub const BLOCKS: Topic = Topic(1);
    /// Reserved for state updates.
    pub const STATE: Topic = Topic(2);
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Topic::DEFAULT => write!(f, "default"),
            Topic::BLOCKS => write!(f, "blocks"),
            Topic::STATE => write!(f, "state"),
            Topic(other) => write!(f, "topic-{other}"),
        }
    }
}

/// Notification that a node was added at `index`.
///
/// Carries no payload. Receivers treat it as a hint to re-check their diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub topic: Topic,
    pub index: Index,
}

/// Encoding hook for box values.
///
/// The encoding is payload-defined; it is appended verbatim to every diff frame.
pub trait Payload: Send + Sync + fmt::Debug {
    /// Encode the value for the wire.
    fn encode(&self) -> Vec<u8>;
}

impl Payload for Vec<u8> {
    fn encode(&self) -> Vec<u8> {
        self.clone()
    }
}

impl Payload for String {
    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// One inserted item.
///
/// `key != parent_key` is required for insertion; the window store rejects
/// self-parenting boxes.
#[derive(Clone, Debug)]
pub struct DagBox {
    /// Layer the box belongs to. Immutable after creation.
    pub index: Index,
    /// Unique key of this box.
    pub key: Hash,
    /// Key of the parent box, which may not have arrived yet.
    pub parent_key: Hash,
    /// Opaque value.
    pub value: Arc<dyn Payload>,
}

impl DagBox {
    /// Creates a new box.
    pub fn new(index: Index, key: Hash, parent_key: Hash, value: Arc<dyn Payload>) -> Self {
        Self {
            index,
            key,
            parent_key,
            value,
        }
    }

    /// Creates a box carrying raw bytes.
    pub fn with_bytes(index: Index, key: Hash, parent_key: Hash, bytes: Vec<u8>) -> Self {
        Self::new(index, key, parent_key, Arc::new(bytes))
    }

    /// Whether the box names itself as its parent.
    pub fn is_self_parented(&self) -> bool {
        self.key == self.parent_key
    }
}

/// A box produced by a data source, addressed to the store of `topic`.
#[derive(Clone, Debug)]
pub struct DataEvent {
    pub topic: Topic,
    pub dag_box: DagBox,
}

impl DataEvent {
    pub fn new(topic: Topic, dag_box: DagBox) -> Self {
        Self { topic, dag_box }
    }
}
