//! Cascade preview values
//!
//! Derived impact counts for a candidate deletion or detachment; computed on
//! demand, never stored.

use serde::{Deserialize, Serialize};

/// Impact of removing one substrate item from a basket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CascadePreview {
    /// Document references that would be detached
    pub refs_detached_count: u64,
    /// Relationship rows that would be pruned
    pub relationships_pruned_count: u64,
    /// Distinct documents among the detached references
    pub affected_documents_count: u64,
}

impl CascadePreview {
    /// True when nothing references the target
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs_detached_count == 0
            && self.relationships_pruned_count == 0
            && self.affected_documents_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_preview() {
        assert!(CascadePreview::default().is_empty());
        let preview = CascadePreview {
            refs_detached_count: 1,
            ..CascadePreview::default()
        };
        assert!(!preview.is_empty());
    }
}
