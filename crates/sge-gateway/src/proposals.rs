//! Proposal lifecycle manager
//!
//! Owns the proposal state machine when the policy decider routes a change
//! to review. Creation lands the proposal row and its announcement event in
//! one transaction. Approval re-validates the stored snapshot, plans the
//! mutation batch, and resolves the proposal in the same transaction that
//! commits the batch: an execution failure leaves the proposal in
//! `Proposed`, and the optimistic status guard makes concurrent
//! approve/reject mutually exclusive.

use crate::error::GatewayError;
use crate::executor::{self, ExecutionContext, ExecutionSummary, MutationExecutor};
use crate::validate;
use serde_json::json;
use sge_store::{ProposalResolution, StoreError, SubstrateStore, TxBatch};
use sge_substrate::timeline::kind as event_kind;
use sge_substrate::{
    ActorId, BlastRadius, ChangeDescriptor, EventDraft, Proposal, ProposalId, ProposalStatus,
    TimelineEvent, ValidatorReport,
};
use std::sync::Arc;

const RESOLVABLE: &[ProposalStatus] = &[ProposalStatus::Proposed, ProposalStatus::UnderReview];

/// Manages proposal creation, approval, and rejection
#[derive(Clone)]
pub struct ProposalLifecycle {
    store: Arc<dyn SubstrateStore>,
    executor: MutationExecutor,
}

impl ProposalLifecycle {
    /// Create a lifecycle manager over a store
    #[must_use]
    pub fn new(store: Arc<dyn SubstrateStore>) -> Self {
        let executor = MutationExecutor::new(Arc::clone(&store));
        Self { store, executor }
    }

    /// Create a lifecycle manager sharing an existing executor
    #[inline]
    #[must_use]
    pub fn with_executor(store: Arc<dyn SubstrateStore>, executor: MutationExecutor) -> Self {
        Self { store, executor }
    }

    /// Queue a change for review; the proposal row and its `change.proposed`
    /// event land in one transaction.
    pub async fn create(
        &self,
        descriptor: ChangeDescriptor,
        blast_radius: BlastRadius,
        validator_report: Option<ValidatorReport>,
    ) -> Result<Proposal, GatewayError> {
        let proposal = Proposal::new(descriptor, blast_radius, validator_report);

        let mut batch = TxBatch::new(proposal.workspace_id);
        batch.events.push(self.lifecycle_event(
            &proposal,
            event_kind::CHANGE_PROPOSED,
            proposal.descriptor.actor_id.clone(),
            json!({
                "entry_point": proposal.descriptor.entry_point.as_str(),
                "operation_count": proposal.descriptor.ops.len(),
                "blast_radius": blast_radius.as_str(),
            }),
        ));
        self.store
            .insert_proposal(proposal.clone(), batch)
            .await
            .map_err(GatewayError::from_execution_store_error)?;

        tracing::info!(proposal = %proposal.id, "proposal created");
        Ok(proposal)
    }

    /// Approve and execute a proposal. Fails without status change when the
    /// stored snapshot no longer validates or any operation fails to commit.
    pub async fn approve(
        &self,
        proposal_id: ProposalId,
        reviewer_id: ActorId,
    ) -> Result<(Proposal, ExecutionSummary, Vec<TimelineEvent>), GatewayError> {
        let proposal = self.load(proposal_id).await?;
        self.check_resolvable(&proposal)?;

        // The snapshot may have been valid at creation and rotted since.
        let outcome = validate::validate(&proposal.descriptor);
        if !outcome.valid {
            return Err(GatewayError::Validation(outcome.errors));
        }

        let ctx = execution_context(&proposal.descriptor);
        let ops = &proposal.descriptor.ops;
        let mut batch = self.executor.plan(ops, &ctx).await?;
        batch.events.push(self.executor.summary_event(ops.len(), &ctx));
        batch.events.push(self.lifecycle_event(
            &proposal,
            event_kind::PROPOSAL_APPROVED,
            reviewer_id.clone(),
            json!({ "operations_executed": ops.len() }),
        ));

        let resolution = ProposalResolution {
            status: ProposalStatus::Accepted,
            reviewer: reviewer_id,
            reason: None,
        };
        let (resolved, events) = self
            .resolve(proposal_id, resolution, batch)
            .await?;

        tracing::info!(proposal = %proposal_id, operations = ops.len(), "proposal approved");
        Ok((
            resolved,
            ExecutionSummary {
                operations_executed: ops.len(),
            },
            events,
        ))
    }

    /// Reject a proposal with a required, non-empty reason
    pub async fn reject(
        &self,
        proposal_id: ProposalId,
        reviewer_id: ActorId,
        reason: &str,
    ) -> Result<Proposal, GatewayError> {
        if reason.trim().is_empty() {
            return Err(GatewayError::Validation(vec![
                "rejection reason is required".to_string(),
            ]));
        }
        let proposal = self.load(proposal_id).await?;
        self.check_resolvable(&proposal)?;

        let mut batch = TxBatch::new(proposal.workspace_id);
        batch.events.push(self.lifecycle_event(
            &proposal,
            event_kind::PROPOSAL_REJECTED,
            reviewer_id.clone(),
            json!({ "reason": reason }),
        ));

        let resolution = ProposalResolution {
            status: ProposalStatus::Rejected,
            reviewer: reviewer_id,
            reason: Some(reason.to_string()),
        };
        let (resolved, _) = self.resolve(proposal_id, resolution, batch).await?;
        tracing::info!(proposal = %proposal_id, "proposal rejected");
        Ok(resolved)
    }

    async fn load(&self, proposal_id: ProposalId) -> Result<Proposal, GatewayError> {
        self.store
            .proposal(proposal_id)
            .await
            .map_err(GatewayError::from_execution_store_error)?
            .ok_or_else(|| GatewayError::NotFound(format!("proposal {proposal_id}")))
    }

    /// Lifecycle event carrying the descriptor's provenance tags, like every
    /// substrate event the executor emits.
    fn lifecycle_event(
        &self,
        proposal: &Proposal,
        kind: &str,
        actor_id: ActorId,
        metadata: serde_json::Value,
    ) -> EventDraft {
        let metadata = executor::with_provenance(metadata, &proposal.descriptor.provenance);
        EventDraft::new(kind, proposal.id.to_string(), actor_id)
            .with_basket(proposal.basket_id)
            .with_metadata(metadata)
    }

    fn check_resolvable(&self, proposal: &Proposal) -> Result<(), GatewayError> {
        if proposal.status.is_terminal() {
            return Err(GatewayError::Transition {
                proposal_id: proposal.id,
                current: proposal.status,
            });
        }
        Ok(())
    }

    async fn resolve(
        &self,
        proposal_id: ProposalId,
        resolution: ProposalResolution,
        batch: TxBatch,
    ) -> Result<(Proposal, Vec<TimelineEvent>), GatewayError> {
        self.store
            .resolve_proposal(proposal_id, RESOLVABLE, resolution, batch)
            .await
            .map_err(|err| match err {
                StoreError::TransitionConflict { current } => GatewayError::Transition {
                    proposal_id,
                    current,
                },
                other => GatewayError::from_execution_store_error(other),
            })
    }
}

fn execution_context(descriptor: &ChangeDescriptor) -> ExecutionContext {
    ExecutionContext {
        workspace_id: descriptor.workspace_id,
        basket_id: descriptor.basket_id,
        actor_id: descriptor.actor_id.clone(),
        entry_point: descriptor.entry_point,
        provenance: descriptor.provenance.clone(),
    }
}
