//! Storage layer errors

use sge_substrate::ProposalStatus;

/// Errors surfaced by [`crate::SubstrateStore`] implementations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected an insert
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Name of the violated constraint
        constraint: String,
    },

    /// A referenced row does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Timeline rows admit no updates or deletes
    #[error("timeline events are immutable")]
    Immutable,

    /// Optimistic status guard failed: the proposal already moved on
    #[error("proposal is {current}, transition refused")]
    TransitionConflict {
        /// Status observed at check time
        current: ProposalStatus,
    },

    /// A write in the batch is structurally unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    /// Shorthand for a missing-row error
    #[inline]
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
