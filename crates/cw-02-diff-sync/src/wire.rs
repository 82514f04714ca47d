//! # Wire Codec
//!
//! All integers are little-endian. Indices travel as their low 32 bits.
//!
//! Diff frame (server → viewer):
//!
//! ```text
//! ┌───────┬───────┬───────┬─────────┬────────────┬──────────┬─────────┐
//! │ topic │ index │ depth │ padding │ parent key │ self key │ payload │
//! │  u32  │  u32  │  u32  │  4 × 0  │  32 bytes  │ 32 bytes │   ...   │
//! └───────┴───────┴───────┴─────────┴────────────┴──────────┴─────────┘
//! ```
//!
//! Status frame (viewer → server):
//!
//! ```text
//! ┌───────┬───────┬──────────┬──────────┬─────┐
//! │ topic │ start │ count[0] │ count[1] │ ... │   one count per window slot
//! │  u32  │  u32  │   u32    │   u32    │     │   starting at `start`
//! └───────┴───────┴──────────┴──────────┴─────┘
//! ```

use crate::errors::WireError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use cw_01_window_store::DiffAtom;
use shared_types::{Hash, Index, Topic};

pub const DIFF_HEADER_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
/// Smallest valid diff frame (empty payload).
pub const DIFF_MIN_LEN: usize = DIFF_HEADER_LEN + 2 * KEY_LEN;
pub const STATUS_HEADER_LEN: usize = 8;

/// Length of a status frame carrying `window_size` counts.
pub fn status_frame_len(window_size: usize) -> usize {
    STATUS_HEADER_LEN + 4 * window_size
}

/// Encodes one diff atom. The payload is serialized here, never under the
/// store lock.
///
/// The index goes out as its low 32 bits. Past `u32::MAX` the wire index
/// wraps to `index % 2^32` while the store keeps counting, so viewers of a
/// stream that long see indices restart from 0.
pub fn encode_diff(topic: Topic, atom: &DiffAtom) -> Bytes {
    let b = atom.node.dag_box();
    let payload = b.value.encode();

    let mut buf = BytesMut::with_capacity(DIFF_MIN_LEN + payload.len());
    buf.put_u32_le(topic.0);
    buf.put_u32_le(b.index as u32);
    buf.put_u32_le(atom.depth);
    buf.put_u32_le(0);
    buf.put_slice(&b.parent_key);
    buf.put_slice(&b.key);
    buf.put_slice(&payload);
    buf.freeze()
}

/// A decoded diff frame, as a viewer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFrame {
    pub topic: Topic,
    pub index: Index,
    pub depth: u32,
    pub parent_key: Hash,
    pub key: Hash,
    pub payload: Bytes,
}

pub fn decode_diff(frame: &[u8]) -> Result<DiffFrame, WireError> {
    if frame.len() < DIFF_MIN_LEN {
        return Err(WireError::TooShort {
            len: frame.len(),
            min: DIFF_MIN_LEN,
        });
    }
    let mut buf = frame;
    let topic = Topic(buf.get_u32_le());
    let index = Index::from(buf.get_u32_le());
    let depth = buf.get_u32_le();
    buf.advance(4);
    let mut parent_key = [0u8; KEY_LEN];
    buf.copy_to_slice(&mut parent_key);
    let mut key = [0u8; KEY_LEN];
    buf.copy_to_slice(&mut key);

    Ok(DiffFrame {
        topic,
        index,
        depth,
        parent_key,
        key,
        payload: Bytes::copy_from_slice(buf),
    })
}

/// A viewer's self-reported status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub topic: Topic,
    pub start: Index,
    /// How many nodes the viewer holds for `start + i`.
    pub counts: Vec<u32>,
}

impl StatusMessage {
    /// End of the interest window this status declares (exclusive).
    pub fn end(&self) -> Index {
        self.start + self.counts.len() as Index
    }
}

/// Parses a status frame carrying exactly `window_size` counts.
///
/// `start` is read as 32 bits and widened, so it can only name indices below
/// `2^32`. Once the store passes that, every status names a window behind
/// the store's newest index and the diff for it comes back empty.
pub fn parse_status(frame: &[u8], window_size: usize) -> Result<StatusMessage, WireError> {
    if frame.len() < STATUS_HEADER_LEN {
        return Err(WireError::TooShort {
            len: frame.len(),
            min: STATUS_HEADER_LEN,
        });
    }
    let body = frame.len() - STATUS_HEADER_LEN;
    if body % 4 != 0 {
        return Err(WireError::Misaligned { len: body });
    }
    if body / 4 != window_size {
        return Err(WireError::CountMismatch {
            expected: window_size,
            got: body / 4,
        });
    }

    let mut buf = frame;
    let topic = Topic(buf.get_u32_le());
    let start = Index::from(buf.get_u32_le());
    let mut counts = Vec::with_capacity(window_size);
    while buf.has_remaining() {
        counts.push(buf.get_u32_le());
    }
    Ok(StatusMessage {
        topic,
        start,
        counts,
    })
}

/// Encodes a status frame, as a viewer would send it.
pub fn encode_status(msg: &StatusMessage) -> Bytes {
    let mut buf = BytesMut::with_capacity(status_frame_len(msg.counts.len()));
    buf.put_u32_le(msg.topic.0);
    buf.put_u32_le(msg.start as u32);
    for count in &msg.counts {
        buf.put_u32_le(*count);
    }
    buf.freeze()
}
