//! Gateway error taxonomy
//!
//! Everything is a synchronous return value at the call boundary. The only
//! failure that is ever swallowed is an upstream validator error, which the
//! gateway explicitly downgrades to a report warning before it reaches this
//! type.

use sge_store::StoreError;
use sge_substrate::{ProposalId, ProposalStatus};
use uuid::Uuid;

/// Errors surfaced by the decision gateway
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Structural validation failed; carries the accumulated violation list
    #[error("invalid change descriptor: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Invalid or unsupported policy/blast-radius value
    #[error("policy error: {0}")]
    Policy(String),

    /// Malformed idempotency key, rejected before any persistence attempt
    #[error("invalid idempotency key: {0:?}")]
    InvalidKey(String),

    /// Idempotency key reused with a divergent payload
    #[error("conflict: {0}")]
    Conflict(String),

    /// A mutation failed mid-batch; the whole batch was rolled back
    #[error("execution failed (trace {trace_id}): {message}")]
    Execution {
        /// Internal trace identifier surfaced instead of partial state
        trace_id: Uuid,
        /// Generic failure description
        message: String,
    },

    /// Operation kind the executor does not handle
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Attempted transition out of a terminal proposal state
    #[error("proposal {proposal_id} is {current}, transition refused")]
    Transition {
        /// Proposal the transition targeted
        proposal_id: ProposalId,
        /// Status observed at check time
        current: ProposalStatus,
    },

    /// Attempted edit or delete of a timeline event
    #[error("timeline events are immutable")]
    ImmutableViolation,

    /// Referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    /// True for errors the caller can correct and resubmit (4xx-equivalent)
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Execution { .. })
    }

    /// Execution failure with a fresh trace id
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            trace_id: Uuid::new_v4(),
            message: message.into(),
        }
    }

    /// Map a storage failure observed during batch execution. Not a `From`
    /// impl: the right mapping depends on where the store call sits.
    #[must_use]
    pub fn from_execution_store_error(err: StoreError) -> Self {
        match err {
            StoreError::Immutable => Self::ImmutableViolation,
            other => Self::execution(other.to_string()),
        }
    }
}
