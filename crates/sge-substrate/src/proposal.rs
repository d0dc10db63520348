//! Proposal lifecycle entity
//!
//! A proposal snapshots the originating descriptor and moves through a small
//! state machine: `Proposed` on creation, optionally `UnderReview` when a
//! reviewer claims it, then terminally `Accepted` or `Rejected`.

use crate::change::{BlastRadius, ChangeDescriptor};
use crate::ids::{ActorId, BasketId, ProposalId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proposal lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    /// Created, awaiting review
    Proposed,
    /// Claimed by a reviewer (valid but never set by the engine itself)
    UnderReview,
    /// Approved and executed (terminal)
    Accepted,
    /// Rejected with a reason (terminal)
    Rejected,
}

impl ProposalStatus {
    /// True for states that admit no further transitions
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Accepted | ProposalStatus::Rejected)
    }

    /// States reachable from this one
    #[must_use]
    pub fn allowed_transitions(&self) -> &'static [ProposalStatus] {
        use ProposalStatus::*;
        match self {
            Proposed => &[UnderReview, Accepted, Rejected],
            UnderReview => &[Accepted, Rejected],
            Accepted | Rejected => &[],
        }
    }

    /// Whether a transition to `to` is legal
    #[inline]
    #[must_use]
    pub fn can_transition_to(&self, to: ProposalStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProposalStatus::Proposed => "PROPOSED",
            ProposalStatus::UnderReview => "UNDER_REVIEW",
            ProposalStatus::Accepted => "ACCEPTED",
            ProposalStatus::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// Free-form analysis produced by the external validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidatorReport {
    /// Confidence score in [0, 1]
    pub confidence: f64,
    /// Candidate duplicates of the proposed substrate
    pub dupes: Vec<String>,
    /// Suggested merges with existing items
    pub suggested_merges: Vec<String>,
    /// Non-fatal findings, including downgraded validator failures
    pub warnings: Vec<String>,
    /// Human-readable impact summary
    pub impact_summary: Option<String>,
}

impl ValidatorReport {
    /// Report carrying only a warning (validator failed or timed out)
    #[must_use]
    pub fn warning_only(warning: impl Into<String>) -> Self {
        Self {
            warnings: vec![warning.into()],
            ..Self::default()
        }
    }
}

/// Pending change awaiting review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal identifier
    pub id: ProposalId,
    /// Owning workspace
    pub workspace_id: WorkspaceId,
    /// Basket scope, if any
    pub basket_id: Option<BasketId>,
    /// Snapshot of the originating descriptor
    pub descriptor: ChangeDescriptor,
    /// Lifecycle state
    pub status: ProposalStatus,
    /// Analysis attached at creation time, if the validator ran
    pub validator_report: Option<ValidatorReport>,
    /// Effective blast radius decided at creation
    pub blast_radius: BlastRadius,
    /// Rejection reason (required for rejected proposals)
    pub review_reason: Option<String>,
    /// Reviewer who resolved the proposal
    pub reviewer: Option<ActorId>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Resolution timestamp
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Proposal {
    /// Create a fresh proposal in the `Proposed` state
    #[must_use]
    pub fn new(
        descriptor: ChangeDescriptor,
        blast_radius: BlastRadius,
        validator_report: Option<ValidatorReport>,
    ) -> Self {
        Self {
            id: ProposalId::new(),
            workspace_id: descriptor.workspace_id,
            basket_id: descriptor.basket_id,
            status: ProposalStatus::Proposed,
            validator_report,
            blast_radius,
            review_reason: None,
            reviewer: None,
            created_at: Utc::now(),
            reviewed_at: None,
            descriptor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::EntryPoint;

    fn proposal() -> Proposal {
        let descriptor = ChangeDescriptor::new(
            EntryPoint::ManualEdit,
            ActorId::new("user-1"),
            WorkspaceId::new(),
        );
        Proposal::new(descriptor, BlastRadius::Local, None)
    }

    #[test]
    fn new_proposal_is_proposed() {
        let p = proposal();
        assert_eq!(p.status, ProposalStatus::Proposed);
        assert!(p.review_reason.is_none());
        assert!(p.reviewed_at.is_none());
    }

    #[test]
    fn terminal_states_admit_nothing() {
        assert!(ProposalStatus::Accepted.is_terminal());
        assert!(ProposalStatus::Rejected.is_terminal());
        assert!(ProposalStatus::Accepted.allowed_transitions().is_empty());
        assert!(!ProposalStatus::Rejected.can_transition_to(ProposalStatus::Proposed));
    }

    #[test]
    fn review_claim_is_representable() {
        assert!(ProposalStatus::Proposed.can_transition_to(ProposalStatus::UnderReview));
        assert!(ProposalStatus::UnderReview.can_transition_to(ProposalStatus::Accepted));
        assert!(ProposalStatus::UnderReview.can_transition_to(ProposalStatus::Rejected));
    }

    #[test]
    fn status_wire_format() {
        let json = serde_json::to_value(ProposalStatus::UnderReview).unwrap();
        assert_eq!(json, "UNDER_REVIEW");
    }
}
