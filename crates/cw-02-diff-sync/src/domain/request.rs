//! A viewer's interest window.

use shared_types::Index;

/// Half-open index range `[start, end)` a viewer wants diffs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRequest {
    pub start: Index,
    pub end: Index,
}

impl DataRequest {
    pub fn new(start: Index, end: Index) -> Self {
        Self { start, end }
    }

    /// The window assumed before a viewer has reported anything: `span`
    /// indices starting at the first trigger seen.
    pub fn starting_at(index: Index, span: usize) -> Self {
        Self {
            start: index,
            end: index.saturating_add(span as Index),
        }
    }

    pub fn contains(&self, index: Index) -> bool {
        index >= self.start && index < self.end
    }
}
